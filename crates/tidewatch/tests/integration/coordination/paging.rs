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

//! Splitting a window's count into page work items.

use std::collections::BTreeSet;
use std::time::Duration;
use tidewatch::{ScanRangeQuery, WorkItem};

use crate::fixtures::Harness;

#[tokio::test]
async fn test_enqueued_pages_cover_count_exactly_once() {
    let query = ScanRangeQuery::build("shop", "orders", Some(1_000), Some(1_002));

    for (count, page_size) in [(1, 50), (49, 50), (50, 50), (51, 50), (120, 50), (1_000, 7)] {
        let harness = Harness::new();
        let queue = harness.queue();

        let enqueued = queue.enqueue_pages(count, &query, page_size).await.unwrap();
        let expected = count.div_ceil(page_size);
        assert_eq!(enqueued, expected, "count={} page_size={}", count, page_size);

        let mut pages = BTreeSet::new();
        while let Some(item) = queue.dequeue(Duration::ZERO).await.unwrap() {
            assert_eq!(item.page_size, page_size);
            assert_eq!(item.query, query);
            assert!(pages.insert(item.page), "page {} enqueued twice", item.page);
        }
        assert_eq!(pages, (1..=expected).collect::<BTreeSet<u64>>());
    }
}

#[test]
fn test_zero_count_produces_no_pages() {
    let query = ScanRangeQuery::build("shop", "orders", None, None);
    assert!(WorkItem::pages(0, &query, 50).is_empty());
}

#[tokio::test]
async fn test_pages_are_enqueued_in_increasing_order() {
    let harness = Harness::new();
    let queue = harness.queue();
    let query = ScanRangeQuery::build("shop", "orders", Some(0), Some(10));

    queue.enqueue_pages(120, &query, 50).await.unwrap();

    let mut order = Vec::new();
    while let Some(item) = queue.dequeue(Duration::ZERO).await.unwrap() {
        order.push(item.page);
    }
    assert_eq!(order, vec![1, 2, 3]);
}
