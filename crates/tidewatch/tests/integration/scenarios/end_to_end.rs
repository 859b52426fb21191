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

//! A single watcher draining a fresh scope.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tidewatch::{Operation, WatchEvent};
use tidewatch_testing::{EventRecorder, RecordingHandler};

use crate::fixtures::{stop_and_join, wait_until, Harness, NAMESPACE, START};

#[tokio::test(start_paused = true)]
async fn test_fresh_scope_with_120_entries_yields_three_pages() {
    let harness = Harness::new();
    harness.insert_documents(120);
    let handler = Arc::new(RecordingHandler::new());
    let watcher = harness.watcher(
        Harness::config().page_size(50).build().unwrap(),
        handler.clone(),
    );
    let recorder = EventRecorder::attach(&watcher);

    let handle = watcher.start();
    wait_until(Duration::from_secs(30), || handler.batches().len() == 3).await;
    stop_and_join(&watcher, handle).await;

    let outcome = recorder.payloads(WatchEvent::InstructionsSet)[0]
        .outcome
        .unwrap();
    assert_eq!(outcome.from, START);
    assert_eq!(outcome.to, START + 2);
    assert_eq!(outcome.count, 120);
    assert_eq!(outcome.pages, 3);

    let sizes: Vec<usize> = handler.batches().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![50, 50, 20]);

    let received: Vec<u64> = recorder
        .payloads(WatchEvent::ReceiveItems)
        .iter()
        .map(|payload| payload.item.as_ref().unwrap().page)
        .collect();
    assert_eq!(received, vec![1, 2, 3]);

    let stats = harness.stats().load().await.unwrap();
    assert_eq!(stats.last_timestamp, Some(outcome.to));
    assert_eq!(harness.queue().depth().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_changes_are_hydrated_with_current_documents() {
    let harness = Harness::new();
    harness
        .collection
        .upsert(json!({ "_id": "a", "status": "shipped", "total": 12 }));
    harness
        .oplog
        .insert(NAMESPACE, START + 1, json!({ "_id": "a", "status": "new", "total": 12 }));
    harness
        .oplog
        .update(NAMESPACE, START + 2, json!("a"), json!({ "status": "shipped" }));
    harness.oplog.delete(NAMESPACE, START + 2, json!("gone"));

    let handler = Arc::new(RecordingHandler::new());
    let watcher = harness.watcher(Harness::config().build().unwrap(), handler.clone());
    let handle = watcher.start();
    wait_until(Duration::from_secs(30), || handler.changes().len() == 3).await;
    stop_and_join(&watcher, handle).await;

    let changes = handler.changes();
    assert_eq!(changes[0].operation, Operation::Insert);
    assert_eq!(changes[0].id, json!("a"));
    assert_eq!(changes[0].doc.as_ref().unwrap()["status"], "shipped");

    assert_eq!(changes[1].operation, Operation::Update);
    assert_eq!(changes[1].diff, json!({ "status": "shipped" }));
    assert_eq!(changes[1].id, json!("a"));

    assert_eq!(changes[2].operation, Operation::Delete);
    assert_eq!(changes[2].id, json!("gone"));
    assert_eq!(changes[2].doc, None);
}

#[tokio::test(start_paused = true)]
async fn test_entries_of_later_windows_are_picked_up() {
    let harness = Harness::new();
    harness.insert_documents(10);
    let handler = Arc::new(RecordingHandler::new());
    let watcher = harness.watcher(Harness::config().build().unwrap(), handler.clone());

    let handle = watcher.start();
    wait_until(Duration::from_secs(30), || handler.changes().len() == 10).await;

    // The next window starts strictly after the first one ended.
    for n in 0..5 {
        harness
            .oplog
            .insert(NAMESPACE, START + 30, json!({ "_id": format!("late-{}", n) }));
    }
    wait_until(Duration::from_secs(60), || handler.changes().len() == 15).await;
    stop_and_join(&watcher, handle).await;

    assert_eq!(handler.batches().len(), 2);
}
