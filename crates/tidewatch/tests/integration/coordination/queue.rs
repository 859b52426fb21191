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

//! Blocking claims on the shared queue.

use std::time::Duration;
use tidewatch::{ScanRangeQuery, WorkItem};
use tokio::time::Instant;

use crate::fixtures::Harness;

fn item(page: u64) -> WorkItem {
    WorkItem {
        page,
        page_size: 50,
        query: ScanRangeQuery::build("shop", "orders", Some(1_000), Some(1_002)),
    }
}

#[tokio::test(start_paused = true)]
async fn test_empty_queue_blocks_for_full_timeout() {
    let harness = Harness::new();
    let queue = harness.queue();

    let started = Instant::now();
    let claimed = queue.dequeue(Duration::from_secs(5)).await.unwrap();

    assert_eq!(claimed, None);
    assert!(started.elapsed() >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_enqueue_during_wait_is_observed() {
    let harness = Harness::new();
    let consumer = harness.queue();
    let producer = harness.queue();

    let waiter = tokio::spawn(async move {
        let started = Instant::now();
        let claimed = consumer.dequeue(Duration::from_secs(5)).await.unwrap();
        (claimed, started.elapsed())
    });

    tokio::time::sleep(Duration::from_secs(2)).await;
    producer.enqueue(&item(7)).await.unwrap();

    let (claimed, waited) = waiter.await.unwrap();
    assert_eq!(claimed, Some(item(7)));
    assert!(waited < Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_returns_immediately() {
    let harness = Harness::new();
    let queue = harness.queue();

    let started = Instant::now();
    assert_eq!(queue.dequeue(Duration::ZERO).await.unwrap(), None);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_consumers_never_share_an_item() {
    let harness = Harness::new();
    let producer = harness.queue();
    for page in 1..=200 {
        producer.enqueue(&item(page)).await.unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..8 {
        let queue = harness.queue();
        handles.push(tokio::spawn(async move {
            let mut claimed = Vec::new();
            while let Some(item) = queue.dequeue(Duration::ZERO).await.unwrap() {
                claimed.push(item.page);
            }
            claimed
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }
    all.sort_unstable();
    assert_eq!(all, (1..=200).collect::<Vec<u64>>());
}
