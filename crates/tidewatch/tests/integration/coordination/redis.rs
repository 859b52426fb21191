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

//! Shared-store contract against a live Redis server.
//!
//! Skipped unless `TIDEWATCH_TEST_REDIS_URL` points at a disposable server.

use std::sync::Arc;
use std::time::Duration;
use tidewatch::{
    AdminLock, Clock, CoordinationScope, RedisClock, RedisStore, ScanRangeQuery, ScopeKeys,
    SharedStore, WorkItem, WorkQueue,
};

async fn connect() -> Option<(RedisStore, ScopeKeys)> {
    let url = std::env::var("TIDEWATCH_TEST_REDIS_URL").ok()?;
    let store = RedisStore::connect(&url).await.unwrap();
    // A fresh collection per run keeps reruns independent.
    let collection = format!("orders{}", chrono::Utc::now().timestamp_micros());
    let keys = CoordinationScope::new("test", "shop", &collection)
        .unwrap()
        .keys("tidewatch-it");
    Some((store, keys))
}

#[tokio::test]
async fn test_redis_lease_single_winner_and_release() {
    let Some((store, keys)) = connect().await else {
        return;
    };
    let lock = AdminLock::new(Arc::new(store), keys, Duration::from_secs(5));

    assert!(lock.try_become_admin().await.unwrap());
    assert!(!lock.try_become_admin().await.unwrap());
    let remaining = lock.remaining().await.unwrap().unwrap();
    assert!(remaining <= Duration::from_secs(5));

    lock.release().await.unwrap();
    assert!(lock.try_become_admin().await.unwrap());
    lock.release().await.unwrap();
}

#[tokio::test]
async fn test_redis_queue_fifo_and_blocking_timeout() {
    let Some((store, keys)) = connect().await else {
        return;
    };
    let queue = WorkQueue::new(Arc::new(store), keys);
    let query = ScanRangeQuery::build("shop", "orders", Some(1), Some(2));

    assert_eq!(queue.enqueue_pages(3, &query, 1).await.unwrap(), 3);
    for page in 1..=3 {
        let item = queue.dequeue(Duration::ZERO).await.unwrap().unwrap();
        assert_eq!(item.page, page);
    }

    let started = std::time::Instant::now();
    assert_eq!(queue.dequeue(Duration::from_secs(1)).await.unwrap(), None);
    assert!(started.elapsed() >= Duration::from_millis(900));

    let item = WorkItem {
        page: 9,
        page_size: 1,
        query,
    };
    queue.dead_letter(&item).await.unwrap();
    assert_eq!(queue.dead_letters().await.unwrap(), vec![item]);
    assert_eq!(queue.purge_dead_letters().await.unwrap(), 1);
}

#[tokio::test]
async fn test_redis_clock_and_counters() {
    let Some((store, keys)) = connect().await else {
        return;
    };
    let now = RedisClock::new(store.clone()).now().await.unwrap();
    assert!((now - chrono::Utc::now().timestamp()).abs() < 60);

    let key = keys.retries("counter");
    assert_eq!(store.incr(&key).await.unwrap(), 1);
    assert_eq!(store.incr(&key).await.unwrap(), 2);
    store.delete(&key).await.unwrap();
    assert_eq!(store.get(&key).await.unwrap(), None);
}

#[tokio::test]
async fn test_redis_blocking_pops_reuse_one_connection() {
    let Some((store, keys)) = connect().await else {
        return;
    };
    assert!(!store.has_blocking_connection());

    let received = || async {
        let mut conn = redis::Client::open(
            std::env::var("TIDEWATCH_TEST_REDIS_URL").unwrap().as_str(),
        )
        .unwrap()
        .get_multiplexed_async_connection()
        .await
        .unwrap();
        let info: String = redis::cmd("INFO")
            .arg("stats")
            .query_async(&mut conn)
            .await
            .unwrap();
        info.lines()
            .find_map(|line| line.strip_prefix("total_connections_received:"))
            .unwrap()
            .trim()
            .parse::<u64>()
            .unwrap()
    };

    let queue = keys.queue();
    store
        .blocking_pop_head(&queue, Duration::from_millis(20))
        .await
        .unwrap();
    assert!(store.has_blocking_connection());

    let before = received().await;
    for _ in 0..20 {
        let clone = store.clone();
        assert_eq!(
            clone
                .blocking_pop_head(&queue, Duration::from_millis(20))
                .await
                .unwrap(),
            None
        );
    }
    // One connection for the second INFO read, plus slack for tests running
    // alongside; a connection per pop would add twenty.
    assert!(received().await - before < 10);
}
