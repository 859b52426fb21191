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

//! Lifecycle events published by a watcher.
//!
//! Each watcher owns its own [`EventRegistry`]. Emission is a synchronous
//! fan-out over the callbacks registered for that event, in registration
//! order. Nothing is persisted; an event with no listener is dropped.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::queue::WorkItem;
use crate::window::WindowOutcome;

/// Events a watcher emits over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchEvent {
    /// This worker won the admin lease and is about to scan.
    SettingInstructions,
    /// The scan found entries and enqueued pages. The wire name is kept as
    /// existing consumers of this event know it.
    #[serde(rename = "instructions_setted")]
    InstructionsSet,
    /// The scan found nothing new.
    NoInstructions,
    /// Another worker holds the lease; waiting on the queue instead.
    WaitingInstructions,
    /// Nothing could be claimed this iteration.
    NoItems,
    /// A work item was claimed and is about to execute.
    ReceiveItems,
    /// Executing a work item failed.
    ErrorProcessing,
    /// A work item exhausted its attempts.
    DeadLettered,
    /// The shared store failed outside item execution.
    CoordinationError,
    /// The loop has halted.
    Stopped,
}

impl WatchEvent {
    pub const ALL: [WatchEvent; 10] = [
        WatchEvent::SettingInstructions,
        WatchEvent::InstructionsSet,
        WatchEvent::NoInstructions,
        WatchEvent::WaitingInstructions,
        WatchEvent::NoItems,
        WatchEvent::ReceiveItems,
        WatchEvent::ErrorProcessing,
        WatchEvent::DeadLettered,
        WatchEvent::CoordinationError,
        WatchEvent::Stopped,
    ];

    /// Stable wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchEvent::SettingInstructions => "setting_instructions",
            WatchEvent::InstructionsSet => "instructions_setted",
            WatchEvent::NoInstructions => "no_instructions",
            WatchEvent::WaitingInstructions => "waiting_instructions",
            WatchEvent::NoItems => "no_items",
            WatchEvent::ReceiveItems => "receive_items",
            WatchEvent::ErrorProcessing => "error_processing",
            WatchEvent::DeadLettered => "dead_lettered",
            WatchEvent::CoordinationError => "coordination_error",
            WatchEvent::Stopped => "stopped",
        }
    }
}

impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data accompanying an event. Only the fields relevant to the event are set.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload {
    pub worker_id: String,
    pub item: Option<WorkItem>,
    pub error: Option<String>,
    pub attempt: Option<u32>,
    pub outcome: Option<WindowOutcome>,
}

impl EventPayload {
    pub fn new(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            item: None,
            error: None,
            attempt: None,
            outcome: None,
        }
    }

    pub fn with_item(mut self, item: WorkItem) -> Self {
        self.item = Some(item);
        self
    }

    pub fn with_error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    pub fn with_outcome(mut self, outcome: WindowOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }
}

/// Callback invoked on emission.
pub type EventCallback = Arc<dyn Fn(&EventPayload) + Send + Sync>;

/// Per-watcher observer registry.
#[derive(Clone, Default)]
pub struct EventRegistry {
    listeners: Arc<RwLock<Vec<(WatchEvent, EventCallback)>>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `event`, after any existing listeners.
    pub fn on<F>(&self, event: WatchEvent, callback: F)
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        self.listeners.write().push((event, Arc::new(callback)));
    }

    /// Invokes every listener of `event` in registration order.
    pub fn emit(&self, event: WatchEvent, payload: &EventPayload) {
        // Snapshot so callbacks may register further listeners.
        let listeners: Vec<EventCallback> = self
            .listeners
            .read()
            .iter()
            .filter(|(registered, _)| *registered == event)
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in listeners {
            callback(payload);
        }
    }

    /// Number of listeners registered for `event`.
    pub fn listener_count(&self, event: WatchEvent) -> usize {
        self.listeners
            .read()
            .iter()
            .filter(|(registered, _)| *registered == event)
            .count()
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}
