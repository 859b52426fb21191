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

//! Operator handling of dead-lettered items.

use std::time::Duration;
use tidewatch::{ScanRangeQuery, WorkItem};

use crate::fixtures::Harness;

fn item(page: u64) -> WorkItem {
    WorkItem {
        page,
        page_size: 50,
        query: ScanRangeQuery::build("shop", "orders", Some(1_000), Some(1_002)),
    }
}

#[tokio::test]
async fn test_requeue_moves_dead_letters_to_queue_tail() {
    let harness = Harness::new();
    let queue = harness.queue();
    queue.enqueue(&item(1)).await.unwrap();
    queue.dead_letter(&item(2)).await.unwrap();
    queue.dead_letter(&item(3)).await.unwrap();

    assert_eq!(queue.dead_letters().await.unwrap(), vec![item(2), item(3)]);
    assert_eq!(queue.requeue_dead_letters().await.unwrap(), 2);
    assert!(queue.dead_letters().await.unwrap().is_empty());

    let mut order = Vec::new();
    while let Some(claimed) = queue.dequeue(Duration::ZERO).await.unwrap() {
        order.push(claimed.page);
    }
    assert_eq!(order, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_purge_reports_removed_count() {
    let harness = Harness::new();
    let queue = harness.queue();
    for page in 1..=4 {
        queue.dead_letter(&item(page)).await.unwrap();
    }

    assert_eq!(queue.purge_dead_letters().await.unwrap(), 4);
    assert_eq!(queue.purge_dead_letters().await.unwrap(), 0);
    assert_eq!(queue.depth().await.unwrap(), 0);
}
