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

//! Coordination scope and shared-key derivation.
//!
//! Every piece of shared state (stats, admin lease, live queue, dead letters,
//! retry ledger) is keyed by a string derived from the watched
//! `(cluster, database, collection)` triple. All cooperating workers watching
//! the same collection must derive identical keys, so derivation lives here
//! and nowhere else.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;

/// Identifies one logical watch target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordinationScope {
    cluster: String,
    database: String,
    collection: String,
}

impl CoordinationScope {
    /// Creates a scope, rejecting empty segments and segments containing `:`
    /// (which would make derived keys ambiguous).
    pub fn new(
        cluster: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let scope = Self {
            cluster: cluster.into(),
            database: database.into(),
            collection: collection.into(),
        };

        for (segment, value) in [
            ("cluster", &scope.cluster),
            ("database", &scope.database),
            ("collection", &scope.collection),
        ] {
            if value.is_empty() || value.contains(':') {
                return Err(ConfigError::InvalidScopeSegment {
                    segment,
                    value: value.clone(),
                });
            }
        }

        Ok(scope)
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The oplog namespace (`database.collection`) entries for this scope carry.
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }

    /// Resolves the shared keys for this scope under `namespace`.
    pub fn keys(&self, namespace: &str) -> ScopeKeys {
        ScopeKeys {
            base: format!(
                "{}:{}:{}:{}",
                namespace, self.cluster, self.database, self.collection
            ),
        }
    }
}

impl fmt::Display for CoordinationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.{}", self.cluster, self.database, self.collection)
    }
}

/// The set of shared-store keys belonging to one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeKeys {
    base: String,
}

impl ScopeKeys {
    /// Hash holding the queue stats.
    pub fn stats(&self) -> &str {
        &self.base
    }

    /// Counter backing the admin lease.
    pub fn admin(&self) -> String {
        format!("{}:admin", self.base)
    }

    /// Live work queue.
    pub fn queue(&self) -> String {
        format!("{}:queue", self.base)
    }

    /// Dead-letter list.
    pub fn dead_letter(&self) -> String {
        format!("{}:dead_letter", self.base)
    }

    /// Execution attempt counter for one item.
    pub fn retries(&self, item_hash: &str) -> String {
        format!("{}:retries:{}", self.base, item_hash)
    }

    /// In-flight breadcrumb for one item.
    pub fn executing(&self, item_hash: &str) -> String {
        format!("{}:executing:{}", self.base, item_hash)
    }
}
