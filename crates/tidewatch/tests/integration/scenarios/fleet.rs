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

//! Several watchers sharing one scope.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tidewatch::WatchEvent;
use tidewatch_testing::{EventRecorder, RecordingHandler};

use crate::fixtures::{wait_until, Harness};

#[tokio::test(start_paused = true)]
async fn test_fleet_processes_every_change_exactly_once() {
    let harness = Harness::new();
    harness.insert_documents(500);

    let mut members = Vec::new();
    for n in 0..4 {
        let handler = Arc::new(RecordingHandler::new());
        let config = Harness::config()
            .page_size(50)
            .worker_id(format!("worker-{}", n))
            .build()
            .unwrap();
        let watcher = harness.watcher(config, handler.clone());
        let recorder = EventRecorder::attach(&watcher);
        members.push((watcher, handler, recorder));
    }

    let handles: Vec<_> = members.iter().map(|(watcher, _, _)| watcher.start()).collect();
    wait_until(Duration::from_secs(60), || {
        members
            .iter()
            .map(|(_, handler, _)| handler.changes().len())
            .sum::<usize>()
            == 500
    })
    .await;
    for (watcher, _, _) in &members {
        watcher.stop();
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut seen = HashSet::new();
    for (_, handler, _) in &members {
        for change in handler.changes() {
            assert!(seen.insert(change.id.to_string()), "duplicate {}", change.id);
        }
    }
    assert_eq!(seen.len(), 500);

    // Only one member scanned the window that produced the pages.
    let leaders = members
        .iter()
        .filter(|(_, _, recorder)| recorder.count(WatchEvent::InstructionsSet) > 0)
        .count();
    assert_eq!(leaders, 1);
    for (_, _, recorder) in &members {
        assert_eq!(recorder.count(WatchEvent::Stopped), 1);
    }
}
