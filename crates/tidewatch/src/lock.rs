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

//! Admin lease: leader election for scan windows.
//!
//! The lease is a counter with a time-to-live. The caller whose increment
//! takes it from 0 to 1 leads the current window; every other caller sees a
//! larger value and must not scan. The leader ends the window by resetting
//! the counter once new stats are persisted. There is deliberately no unlock
//! on the failure path: a leader that dies mid-scan cannot run cleanup, so
//! the lease recovers by expiring.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::StoreError;
use crate::scope::ScopeKeys;
use crate::store::SharedStore;

/// Time-bounded optimistic lock over one scope's scan window.
#[derive(Clone)]
pub struct AdminLock {
    store: Arc<dyn SharedStore>,
    keys: ScopeKeys,
    ttl: Duration,
}

impl AdminLock {
    pub fn new(store: Arc<dyn SharedStore>, keys: ScopeKeys, ttl: Duration) -> Self {
        Self { store, keys, ttl }
    }

    /// Competes for leadership of the current window.
    ///
    /// Returns `true` iff this call was the first increment since the last
    /// release or expiry. The TTL is armed by that same atomic increment.
    pub async fn try_become_admin(&self) -> Result<bool, StoreError> {
        let holders = self
            .store
            .incr_with_expiry(&self.keys.admin(), self.ttl)
            .await?;
        debug!("Admin lease counter at {}", holders);
        Ok(holders == 1)
    }

    /// Ends the current window early, making leadership available again.
    pub async fn release(&self) -> Result<(), StoreError> {
        self.store.delete(&self.keys.admin()).await
    }

    /// Remaining lease time, `None` when nobody holds the lease.
    pub async fn remaining(&self) -> Result<Option<Duration>, StoreError> {
        self.store.ttl(&self.keys.admin()).await
    }
}
