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

//! Window scheduling against the in-memory oplog.

use std::time::Duration;
use tidewatch::{QueueStats, WindowScheduler};
use tokio::time::Instant;

use crate::fixtures::{Harness, NAMESPACE, START};

fn scheduler(harness: &Harness, page_size: u64) -> WindowScheduler {
    let config = Harness::config().page_size(page_size).build().unwrap();
    WindowScheduler::new(
        harness.scope.clone(),
        harness.shared(),
        harness.clock.clone(),
        harness.oplog.clone(),
        &config,
    )
}

#[tokio::test(start_paused = true)]
async fn test_zero_count_windows_only_advance_desired_timestamp() {
    let harness = Harness::new();
    let scheduler = scheduler(&harness, 50);
    let stats = harness.stats();

    let mut previous_desired = None;
    for _ in 0..4 {
        let outcome = scheduler.run_window().await.unwrap();
        assert_eq!(outcome.count, 0);

        let current = stats.load().await.unwrap();
        assert_eq!(current.last_timestamp, Some(START));
        let desired = current.desired_timestamp.unwrap();
        if let Some(previous) = previous_desired {
            assert_eq!(desired, previous + 2);
        }
        previous_desired = Some(desired);
    }
    assert_eq!(harness.queue().depth().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_entries_arriving_after_empty_window_are_not_skipped() {
    let harness = Harness::new();
    let scheduler = scheduler(&harness, 50);

    let empty = scheduler.run_window().await.unwrap();
    assert_eq!(empty.count, 0);

    // Lands inside the previous window's range after it was counted.
    harness
        .oplog
        .insert(NAMESPACE, START + 1, serde_json::json!({ "_id": "late" }));

    let outcome = scheduler.run_window().await.unwrap();
    assert_eq!(outcome.from, START);
    assert_eq!(outcome.count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_throttle_waits_until_desired_timestamp() {
    let harness = Harness::new();
    let scheduler = scheduler(&harness, 50);
    harness.stats().save(START, START + 7).await.unwrap();

    let started = Instant::now();
    let outcome = scheduler.run_window().await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(7));
    assert_eq!(outcome.to, START + 7);
    assert_eq!(
        harness.stats().load().await.unwrap(),
        QueueStats {
            last_timestamp: Some(START),
            desired_timestamp: Some(START + 9),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_window_excludes_entries_outside_range() {
    let harness = Harness::new();
    let scheduler = scheduler(&harness, 10);
    harness.stats().save(START, START).await.unwrap();

    harness.oplog.insert(NAMESPACE, START, serde_json::json!({ "_id": "old" }));
    harness
        .oplog
        .insert("shop.users", START, serde_json::json!({ "_id": "other" }));
    tokio::time::advance(Duration::from_secs(3)).await;
    harness
        .oplog
        .insert(NAMESPACE, START + 3, serde_json::json!({ "_id": "new" }));
    harness
        .oplog
        .insert(NAMESPACE, START + 4, serde_json::json!({ "_id": "future" }));

    let outcome = scheduler.run_window().await.unwrap();
    assert_eq!(outcome.count, 1);
    assert_eq!(outcome.to, START + 3);
}
