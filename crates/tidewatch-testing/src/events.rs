/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

use parking_lot::Mutex;
use std::sync::Arc;
use tidewatch::{EventPayload, WatchEvent, Watcher, WorkItem};

/// Captures every event a watcher emits, in emission order.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<(WatchEvent, EventPayload)>>>,
}

impl EventRecorder {
    /// Subscribes a new recorder to every event of `watcher`.
    pub fn attach(watcher: &Watcher) -> Self {
        let recorder = Self::default();
        for event in WatchEvent::ALL {
            let events = recorder.events.clone();
            watcher.on(event, move |payload| {
                events.lock().push((event, payload.clone()));
            });
        }
        recorder
    }

    pub fn events(&self) -> Vec<WatchEvent> {
        self.events.lock().iter().map(|(event, _)| *event).collect()
    }

    pub fn payloads(&self, event: WatchEvent) -> Vec<EventPayload> {
        self.events
            .lock()
            .iter()
            .filter(|(recorded, _)| *recorded == event)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn count(&self, event: WatchEvent) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|(recorded, _)| *recorded == event)
            .count()
    }

    /// Occurrences of `event` whose payload carries `item`.
    pub fn count_for(&self, event: WatchEvent, item: &WorkItem) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|(recorded, payload)| *recorded == event && payload.item.as_ref() == Some(item))
            .count()
    }

    /// Events recorded after the first occurrence of `marker`.
    pub fn after(&self, marker: WatchEvent) -> Vec<WatchEvent> {
        self.events()
            .into_iter()
            .skip_while(|event| *event != marker)
            .skip(1)
            .collect()
    }
}
