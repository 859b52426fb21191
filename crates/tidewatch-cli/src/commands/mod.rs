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

//! Operator commands. Each works on a [`Target`], the shared state of one
//! scope, so the same code runs against Redis and the in-memory store.

pub mod dead_letters;
pub mod lease;
pub mod queue;
pub mod stats;

use anyhow::{Context, Result};
use std::sync::Arc;
use tidewatch::{
    AdminLock, CoordinationScope, RedisStore, ScopeKeys, SharedStore, StatsRepository, WorkQueue,
};

/// Admin lease TTL is irrelevant to operator commands; they never acquire.
const UNUSED_LEASE_TTL: std::time::Duration = std::time::Duration::from_secs(60);

/// The shared state of one coordination scope.
pub struct Target {
    pub scope: CoordinationScope,
    pub keys: ScopeKeys,
    pub store: Arc<dyn SharedStore>,
}

impl Target {
    pub fn new(scope: CoordinationScope, namespace: &str, store: Arc<dyn SharedStore>) -> Self {
        Self {
            keys: scope.keys(namespace),
            scope,
            store,
        }
    }

    /// Connects to Redis and resolves the scope's keys.
    pub async fn connect(
        redis_url: &str,
        namespace: &str,
        cluster: &str,
        database: &str,
        collection: &str,
    ) -> Result<Self> {
        let scope = CoordinationScope::new(cluster, database, collection)
            .context("Invalid coordination scope")?;
        let store = RedisStore::connect(redis_url)
            .await
            .context("Failed to connect to Redis")?;
        Ok(Self::new(scope, namespace, Arc::new(store)))
    }

    pub fn queue(&self) -> WorkQueue {
        WorkQueue::new(self.store.clone(), self.keys.clone())
    }

    pub fn stats(&self) -> StatsRepository {
        StatsRepository::new(self.store.clone(), self.keys.clone())
    }

    pub fn lock(&self) -> AdminLock {
        AdminLock::new(self.store.clone(), self.keys.clone(), UNUSED_LEASE_TTL)
    }
}
