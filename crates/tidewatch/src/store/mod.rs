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

//! Shared-store abstraction backing every piece of coordination state.
//!
//! The coordinator never holds authoritative state in memory: the admin
//! lease, queue stats, live queue, dead letters and retry ledger all live in
//! a [`SharedStore`] that every cooperating worker can see. Each primitive
//! must be atomic on its own; compound effects are sequenced by callers and
//! are not jointly transactional.
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryStore`]: process-local, for tests and single-host experiments.
//!   Clones share state, so several watchers in one process behave like
//!   several processes against one store.
//! - [`RedisStore`] (feature `redis`): the production backend.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::StoreError;

mod memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis_store::{RedisClock, RedisStore};

/// Atomic key/value, hash and list primitives over shared storage.
///
/// Keys are plain strings; namespacing per coordination scope is the job of
/// [`ScopeKeys`](crate::scope::ScopeKeys).
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Increments the integer at `key` (absent counts as 0) and returns the
    /// new value.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Increments the integer at `key` and, iff this increment created it
    /// (the new value is 1), sets it to expire after `ttl`. Both effects are
    /// applied atomically.
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, StoreError>;

    /// Reads a string value.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a string value, clearing any expiry.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key` regardless of its type. Missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Remaining time to live of `key`, `None` if missing or persistent.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;

    /// Reads one field of the hash at `key`.
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;

    /// Writes one field of the hash at `key`.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;

    /// Appends `value` to the tail of the list at `key`.
    async fn push_tail(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Pops from the head of the list at `key` without waiting.
    async fn pop_head(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Pops from the head of the list at `key`, waiting up to `timeout` for a
    /// value to arrive. Returns `None` only once the full timeout elapsed.
    async fn blocking_pop_head(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<Option<String>, StoreError>;

    /// Length of the list at `key` (0 when missing).
    async fn list_len(&self, key: &str) -> Result<usize, StoreError>;

    /// Every element of the list at `key`, head first.
    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError>;
}
