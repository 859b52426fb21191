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

//! Window scheduler: the elected admin's scan of one time window.
//!
//! A window covers `(last_timestamp, current_timestamp]`. The scheduler
//! throttles until the persisted desired timestamp, counts matching log
//! entries, enqueues one work item per page and records progress. Leadership
//! is released on both the "entries found" and the "nothing new" branch.
//!
//! The throttle never sleeps longer than one window interval. A desired
//! timestamp further out (written by a peer with a longer interval, or left
//! behind by a clock stepping backwards) would otherwise outlive the admin
//! lease and let a second leader scan the same range.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::WatcherConfig;
use crate::enumerator::LogEnumerator;
use crate::error::CoordinationError;
use crate::lock::AdminLock;
use crate::queue::WorkQueue;
use crate::scope::CoordinationScope;
use crate::stats::StatsRepository;
use crate::store::SharedStore;

/// Result of one scan window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOutcome {
    /// Exclusive lower bound of the scanned range.
    pub from: i64,
    /// Inclusive upper bound of the scanned range.
    pub to: i64,
    /// Log entries found in the range.
    pub count: u64,
    /// Work items enqueued.
    pub pages: u64,
}

/// Runs scan windows for one scope. Only the elected admin calls
/// [`run_window`](Self::run_window).
#[derive(Clone)]
pub struct WindowScheduler {
    scope: CoordinationScope,
    stats: StatsRepository,
    queue: WorkQueue,
    lock: AdminLock,
    clock: Arc<dyn Clock>,
    enumerator: Arc<dyn LogEnumerator>,
    window_interval_secs: i64,
    page_size: u64,
}

impl WindowScheduler {
    pub fn new(
        scope: CoordinationScope,
        store: Arc<dyn SharedStore>,
        clock: Arc<dyn Clock>,
        enumerator: Arc<dyn LogEnumerator>,
        config: &WatcherConfig,
    ) -> Self {
        let keys = scope.keys(config.key_namespace());
        Self {
            stats: StatsRepository::new(store.clone(), keys.clone()),
            queue: WorkQueue::new(store.clone(), keys.clone()),
            lock: AdminLock::new(store, keys, config.admin_lease_ttl()),
            scope,
            clock,
            enumerator,
            window_interval_secs: config.window_interval_secs(),
            page_size: config.page_size(),
        }
    }

    /// Throttles, scans the next window and releases leadership.
    ///
    /// On error the lease is left in place and recovers through its TTL.
    pub async fn run_window(&self) -> Result<WindowOutcome, CoordinationError> {
        let now = self.clock.now().await?;
        let stats = self.stats.load().await?.resolve(now, self.window_interval_secs);

        let delay = (stats.desired_timestamp - now).min(self.window_interval_secs);
        if delay > 0 {
            if stats.desired_timestamp - now > delay {
                warn!(
                    "Desired timestamp of {} is {}s ahead, capping throttle at {}s",
                    self.scope,
                    stats.desired_timestamp - now,
                    delay
                );
            }
            debug!("Throttling scan of {} for {}s", self.scope, delay);
            tokio::time::sleep(Duration::from_secs(delay as u64)).await;
        }

        let current = self.clock.now().await?;
        let query = self.enumerator.build_scan_query(
            self.scope.database(),
            self.scope.collection(),
            Some(stats.last_timestamp),
            Some(current),
        );
        let count = self.enumerator.count(&query).await?;
        let next_desired = current + self.window_interval_secs;

        let outcome = if count > 0 {
            let pages = self
                .queue
                .enqueue_pages(count, &query, self.page_size)
                .await?;
            self.stats.save(current, next_desired).await?;
            info!(
                "Scanned {} over ({}, {}]: {} entries in {} page(s)",
                self.scope, stats.last_timestamp, current, count, pages
            );
            WindowOutcome {
                from: stats.last_timestamp,
                to: current,
                count,
                pages,
            }
        } else {
            // Keep last_timestamp so entries landing between read and count
            // are picked up by the next window.
            self.stats
                .save(stats.last_timestamp, next_desired)
                .await?;
            debug!(
                "No entries for {} over ({}, {}]",
                self.scope, stats.last_timestamp, current
            );
            WindowOutcome {
                from: stats.last_timestamp,
                to: current,
                count: 0,
                pages: 0,
            }
        };

        self.lock.release().await?;
        Ok(outcome)
    }
}
