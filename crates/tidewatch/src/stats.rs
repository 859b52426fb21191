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

//! Queue stats: the durable record of scan progress for a scope.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::StoreError;
use crate::scope::ScopeKeys;
use crate::store::SharedStore;

const LAST_TIMESTAMP: &str = "last_timestamp";
const DESIRED_TIMESTAMP: &str = "desired_timestamp";

/// Sparse stats as persisted; either field may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// End of the most recently completed scan.
    pub last_timestamp: Option<i64>,
    /// Earliest time the next scan may begin.
    pub desired_timestamp: Option<i64>,
}

/// Stats with every field resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedStats {
    pub last_timestamp: i64,
    pub desired_timestamp: i64,
}

impl QueueStats {
    /// Coalesces absent fields with their defaults: `now` for the last
    /// timestamp and `now + window_interval` for the desired one, so a scope
    /// without history throttles first instead of scanning unbounded history.
    pub fn resolve(self, now: i64, window_interval_secs: i64) -> ResolvedStats {
        let defaults = ResolvedStats {
            last_timestamp: now,
            desired_timestamp: now + window_interval_secs,
        };
        ResolvedStats {
            last_timestamp: self.last_timestamp.unwrap_or(defaults.last_timestamp),
            desired_timestamp: self
                .desired_timestamp
                .unwrap_or(defaults.desired_timestamp),
        }
    }
}

/// Reads and writes the stats hash of one scope.
#[derive(Clone)]
pub struct StatsRepository {
    store: Arc<dyn SharedStore>,
    keys: ScopeKeys,
}

impl StatsRepository {
    pub fn new(store: Arc<dyn SharedStore>, keys: ScopeKeys) -> Self {
        Self { store, keys }
    }

    pub async fn load(&self) -> Result<QueueStats, StoreError> {
        Ok(QueueStats {
            last_timestamp: self.read_field(LAST_TIMESTAMP).await?,
            desired_timestamp: self.read_field(DESIRED_TIMESTAMP).await?,
        })
    }

    /// Persists both fields. The two writes are independent atomic
    /// operations.
    pub async fn save(&self, last_timestamp: i64, desired_timestamp: i64) -> Result<(), StoreError> {
        let key = self.keys.stats();
        self.store
            .hash_set(key, LAST_TIMESTAMP, &last_timestamp.to_string())
            .await?;
        self.store
            .hash_set(key, DESIRED_TIMESTAMP, &desired_timestamp.to_string())
            .await
    }

    /// Forgets all scan progress; the next window starts from "now".
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.store.delete(self.keys.stats()).await
    }

    async fn read_field(&self, field: &str) -> Result<Option<i64>, StoreError> {
        let key = self.keys.stats();
        // Empty strings count as absent, same as a missing field.
        match self.store.hash_get(key, field).await? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| StoreError::Corrupt {
                    key: format!("{}.{}", key, field),
                    message: format!("'{}' is not a timestamp", raw),
                }),
        }
    }
}
