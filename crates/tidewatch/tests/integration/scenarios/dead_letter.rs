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

//! Items that keep failing end up in the dead-letter list.

use std::sync::Arc;
use std::time::Duration;
use tidewatch::WatchEvent;
use tidewatch_testing::{EventRecorder, RecordingHandler};

use crate::fixtures::{stop_and_join, wait_until, Harness};

#[tokio::test(start_paused = true)]
async fn test_always_failing_handler_dead_letters_after_five_attempts() {
    let harness = Harness::new();
    harness.insert_documents(3);
    let handler = Arc::new(RecordingHandler::always_failing());
    let watcher = harness.watcher(Harness::config().build().unwrap(), handler.clone());
    let recorder = EventRecorder::attach(&watcher);

    let handle = watcher.start();
    wait_until(Duration::from_secs(30), || {
        recorder.count(WatchEvent::DeadLettered) == 1
    })
    .await;
    stop_and_join(&watcher, handle).await;

    let item = recorder.payloads(WatchEvent::ReceiveItems)[0]
        .item
        .clone()
        .unwrap();
    assert_eq!(recorder.count_for(WatchEvent::ErrorProcessing, &item), 5);
    assert_eq!(recorder.count_for(WatchEvent::ReceiveItems, &item), 5);
    assert_eq!(handler.calls(), 5);

    let attempts: Vec<Option<u32>> = recorder
        .payloads(WatchEvent::ErrorProcessing)
        .iter()
        .map(|payload| payload.attempt)
        .collect();
    assert_eq!(attempts, vec![Some(1), Some(2), Some(3), Some(4), Some(5)]);

    let queue = harness.queue();
    assert_eq!(queue.dead_letters().await.unwrap(), vec![item]);
    assert_eq!(queue.depth().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_error_payload_carries_handler_message() {
    let harness = Harness::new();
    harness.insert_documents(1);
    let handler = Arc::new(RecordingHandler::always_failing());
    let watcher = harness.watcher(
        Harness::config().max_attempts(1).build().unwrap(),
        handler.clone(),
    );
    let recorder = EventRecorder::attach(&watcher);

    let handle = watcher.start();
    wait_until(Duration::from_secs(30), || {
        recorder.count(WatchEvent::DeadLettered) == 1
    })
    .await;
    stop_and_join(&watcher, handle).await;

    let payload = &recorder.payloads(WatchEvent::ErrorProcessing)[0];
    assert!(payload
        .error
        .as_deref()
        .unwrap()
        .contains("handler failure on call 1"));
    assert_eq!(payload.worker_id, watcher.config().worker_id());
}
