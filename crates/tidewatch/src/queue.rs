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

//! Shared FIFO of work items and the dead-letter list.
//!
//! Each [`WorkItem`] describes one page of a scan window. Items are stored as
//! JSON strings in the scope's live queue; pops are single-consumer and
//! atomic at the store level, so concurrent workers never receive the same
//! item from one enqueue.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::enumerator::ScanRangeQuery;
use crate::error::StoreError;
use crate::scope::ScopeKeys;
use crate::store::SharedStore;

/// One page of log entries to retrieve and process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    /// 1-based page index within the scan window.
    pub page: u64,
    pub page_size: u64,
    pub query: ScanRangeQuery,
}

impl WorkItem {
    /// Splits a window of `count` entries into `ceil(count / page_size)`
    /// items, in increasing page order.
    pub fn pages(count: u64, query: &ScanRangeQuery, page_size: u64) -> Vec<WorkItem> {
        if page_size == 0 {
            return Vec::new();
        }
        (1..=count.div_ceil(page_size))
            .map(|page| WorkItem {
                page,
                page_size,
                query: query.clone(),
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(|source| StoreError::Serialization {
            key: format!("work item page {}", self.page),
            source,
        })
    }

    pub fn from_json(key: &str, raw: &str) -> Result<Self, StoreError> {
        serde_json::from_str(raw).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })
    }

    /// Identity used by the retry ledger: SHA-256 hex of the serialized item.
    ///
    /// Serialization follows field declaration order, so two items hash
    /// equal iff every serialized field is identical.
    pub fn identity_hash(&self) -> Result<String, StoreError> {
        let serialized = self.to_json()?;
        Ok(hex::encode(Sha256::digest(serialized.as_bytes())))
    }
}

/// Scope-bound view over the live queue and dead-letter list.
#[derive(Clone)]
pub struct WorkQueue {
    store: Arc<dyn SharedStore>,
    keys: ScopeKeys,
}

impl WorkQueue {
    pub fn new(store: Arc<dyn SharedStore>, keys: ScopeKeys) -> Self {
        Self { store, keys }
    }

    /// Appends `item` to the tail of the live queue.
    pub async fn enqueue(&self, item: &WorkItem) -> Result<(), StoreError> {
        self.store
            .push_tail(&self.keys.queue(), &item.to_json()?)
            .await
    }

    /// Builds and enqueues every page of a scan window, returning the number
    /// of items enqueued.
    pub async fn enqueue_pages(
        &self,
        count: u64,
        query: &ScanRangeQuery,
        page_size: u64,
    ) -> Result<u64, StoreError> {
        let items = WorkItem::pages(count, query, page_size);
        for item in &items {
            self.enqueue(item).await?;
        }
        debug!(
            "Enqueued {} page(s) for {} entries of {}",
            items.len(),
            count,
            query.namespace
        );
        Ok(items.len() as u64)
    }

    /// Pops the head of the live queue.
    ///
    /// A zero `timeout` returns immediately; a positive one waits up to
    /// `timeout` for an item to arrive. A payload that does not decode is
    /// moved verbatim to the dead-letter list before the error is returned.
    pub async fn dequeue(&self, timeout: Duration) -> Result<Option<WorkItem>, StoreError> {
        let key = self.keys.queue();
        let raw = if timeout.is_zero() {
            self.store.pop_head(&key).await?
        } else {
            self.store.blocking_pop_head(&key, timeout).await?
        };
        let Some(raw) = raw else {
            return Ok(None);
        };
        match WorkItem::from_json(&key, &raw) {
            Ok(item) => Ok(Some(item)),
            Err(err) => {
                warn!("Undecodable payload on {}, moving it to dead letters", key);
                self.store.push_tail(&self.keys.dead_letter(), &raw).await?;
                Err(err)
            }
        }
    }

    /// Number of items waiting in the live queue.
    pub async fn depth(&self) -> Result<usize, StoreError> {
        self.store.list_len(&self.keys.queue()).await
    }

    /// Moves `item` into the dead-letter list.
    pub async fn dead_letter(&self, item: &WorkItem) -> Result<(), StoreError> {
        self.store
            .push_tail(&self.keys.dead_letter(), &item.to_json()?)
            .await
    }

    /// Every dead-lettered item, oldest first.
    pub async fn dead_letters(&self) -> Result<Vec<WorkItem>, StoreError> {
        let key = self.keys.dead_letter();
        self.store
            .list_range(&key)
            .await?
            .iter()
            .map(|raw| WorkItem::from_json(&key, raw))
            .collect()
    }

    /// Raw dead-letter entries, oldest first, including payloads that no
    /// longer decode as work items.
    pub async fn dead_letter_payloads(&self) -> Result<Vec<String>, StoreError> {
        self.store.list_range(&self.keys.dead_letter()).await
    }

    /// Moves every dead-lettered item back to the tail of the live queue.
    ///
    /// Operator-driven; the worker loop never calls this. Retry counters are
    /// left untouched, so a requeued item that fails again is dead-lettered
    /// after a single further attempt unless its counter is cleared.
    pub async fn requeue_dead_letters(&self) -> Result<usize, StoreError> {
        let dead_key = self.keys.dead_letter();
        let queue_key = self.keys.queue();
        let mut moved = 0;
        while let Some(raw) = self.store.pop_head(&dead_key).await? {
            self.store.push_tail(&queue_key, &raw).await?;
            moved += 1;
        }
        info!("Requeued {} dead-lettered item(s)", moved);
        Ok(moved)
    }

    /// Drops every dead-lettered item, returning how many were removed.
    pub async fn purge_dead_letters(&self) -> Result<usize, StoreError> {
        let key = self.keys.dead_letter();
        let count = self.store.list_len(&key).await?;
        self.store.delete(&key).await?;
        info!("Purged {} dead-lettered item(s)", count);
        Ok(count)
    }
}
