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

//! Retry / dead-letter ledger around item execution.
//!
//! Attempts are counted before the action runs, so a process that dies
//! mid-execution still leaves an accurate attempt count behind. The counter
//! survives requeues and only disappears when the item succeeds.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::error::{ExecutionError, LedgerError, StoreError};
use crate::queue::{WorkItem, WorkQueue};
use crate::scope::ScopeKeys;
use crate::store::SharedStore;

/// Attempt bookkeeping for work items of one scope.
#[derive(Clone)]
pub struct RetryLedger {
    store: Arc<dyn SharedStore>,
    keys: ScopeKeys,
    queue: WorkQueue,
    max_attempts: u32,
}

impl RetryLedger {
    pub fn new(store: Arc<dyn SharedStore>, keys: ScopeKeys, max_attempts: u32) -> Self {
        Self {
            queue: WorkQueue::new(store.clone(), keys.clone()),
            store,
            keys,
            max_attempts,
        }
    }

    /// Runs `action` for `item` under attempt tracking.
    ///
    /// On failure the item is pushed back to the live queue, or moved to the
    /// dead-letter list once `max_attempts` attempts have started, and the
    /// failure is returned as [`LedgerError::Execution`].
    pub async fn run_with_ledger<F, Fut>(&self, item: &WorkItem, action: F) -> Result<(), LedgerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ExecutionError>>,
    {
        let hash = item.identity_hash()?;
        let retries_key = self.keys.retries(&hash);
        let executing_key = self.keys.executing(&hash);

        let attempt = match self.begin(item, &retries_key, &executing_key).await {
            Ok(attempt) => attempt,
            Err(err) => {
                self.restore(item).await;
                return Err(err.into());
            }
        };
        debug!("Executing page {} (attempt {})", item.page, attempt);

        match action().await {
            Ok(()) => {
                self.store.delete(&executing_key).await?;
                self.store.delete(&retries_key).await?;
                Ok(())
            }
            Err(source) => {
                let dead_lettered = attempt >= self.max_attempts;
                if dead_lettered {
                    warn!(
                        "Page {} of {} failed {} time(s), moving to dead letters: {}",
                        item.page, item.query.namespace, attempt, source
                    );
                    self.queue.dead_letter(item).await?;
                } else {
                    debug!("Page {} failed on attempt {}, requeueing", item.page, attempt);
                    self.queue.enqueue(item).await?;
                }
                self.store.delete(&executing_key).await?;
                Err(LedgerError::Execution {
                    attempt,
                    dead_lettered,
                    source,
                })
            }
        }
    }

    /// Counts the attempt and leaves the in-flight breadcrumb.
    async fn begin(
        &self,
        item: &WorkItem,
        retries_key: &str,
        executing_key: &str,
    ) -> Result<u32, StoreError> {
        let attempt = self.store.incr(retries_key).await?;
        self.store.set(executing_key, &item.to_json()?).await?;
        Ok(u32::try_from(attempt).unwrap_or(u32::MAX))
    }

    /// Puts a claimed item back when its bookkeeping could not be written.
    async fn restore(&self, item: &WorkItem) {
        match self.queue.enqueue(item).await {
            Ok(()) => warn!("Bookkeeping for page {} failed, item requeued", item.page),
            Err(err) => error!(
                "Lost page {} of {} after a bookkeeping failure ({}): {:?}",
                item.page, item.query.namespace, err, item
            ),
        }
    }

    /// Attempts recorded for `item` so far.
    pub async fn attempts(&self, item: &WorkItem) -> Result<u32, LedgerError> {
        let key = self.keys.retries(&item.identity_hash()?);
        let attempts = match self.store.get(&key).await? {
            None => 0,
            Some(raw) => raw.parse().map_err(|_| StoreError::Corrupt {
                key: key.clone(),
                message: format!("'{}' is not an attempt count", raw),
            })?,
        };
        Ok(attempts)
    }

    /// Whether an execution of `item` is currently recorded as in flight.
    pub async fn is_in_flight(&self, item: &WorkItem) -> Result<bool, LedgerError> {
        let key = self.keys.executing(&item.identity_hash()?);
        Ok(self.store.get(&key).await?.is_some())
    }
}
