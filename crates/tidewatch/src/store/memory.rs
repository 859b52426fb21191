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

//! Process-local [`SharedStore`] backend.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::SharedStore;
use crate::error::StoreError;

enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    List(VecDeque<String>),
}

struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct Keyspace {
    slots: HashMap<String, Slot>,
}

impl Keyspace {
    /// Returns the live slot for `key`, evicting it first if it has expired.
    fn live(&mut self, key: &str) -> Option<&mut Slot> {
        let expired = self
            .slots
            .get(key)
            .and_then(|slot| slot.expires_at)
            .is_some_and(|deadline| deadline <= Instant::now());
        if expired {
            self.slots.remove(key);
        }
        self.slots.get_mut(key)
    }

    fn list_mut(&mut self, key: &str) -> Result<Option<&mut VecDeque<String>>, StoreError> {
        match self.live(key) {
            None => Ok(None),
            Some(Slot {
                value: Value::List(list),
                ..
            }) => Ok(Some(list)),
            Some(_) => Err(wrong_type(key, "list")),
        }
    }

    fn pop_head(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        let popped = match self.list_mut(key)? {
            Some(list) => list.pop_front(),
            None => None,
        };
        if matches!(self.list_mut(key)?, Some(list) if list.is_empty()) {
            self.slots.remove(key);
        }
        Ok(popped)
    }
}

fn wrong_type(key: &str, expected: &str) -> StoreError {
    StoreError::Corrupt {
        key: key.to_string(),
        message: format!("WRONGTYPE: expected a {}", expected),
    }
}

struct Inner {
    keyspace: Mutex<Keyspace>,
    pushed: Notify,
}

/// In-memory [`SharedStore`].
///
/// Expiry is measured on [`tokio::time::Instant`], so lease TTLs follow
/// `tokio::time::pause()`/`advance()` in tests.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("keys", &self.inner.keyspace.lock().slots.len())
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                keyspace: Mutex::new(Keyspace::default()),
                pushed: Notify::new(),
            }),
        }
    }

    /// Whether `key` currently holds a live value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.keyspace.lock().live(key).is_some()
    }

    fn incr_inner(&self, key: &str, ttl: Option<Duration>) -> Result<i64, StoreError> {
        let mut keyspace = self.inner.keyspace.lock();
        let current = match keyspace.live(key) {
            None => 0,
            Some(Slot {
                value: Value::Str(raw),
                ..
            }) => raw.parse::<i64>().map_err(|_| StoreError::Corrupt {
                key: key.to_string(),
                message: format!("value '{}' is not an integer", raw),
            })?,
            Some(_) => return Err(wrong_type(key, "string")),
        };

        let next = current + 1;
        let slot = keyspace.slots.entry(key.to_string()).or_insert(Slot {
            value: Value::Str(String::new()),
            expires_at: None,
        });
        slot.value = Value::Str(next.to_string());
        if next == 1 {
            if let Some(ttl) = ttl {
                slot.expires_at = Some(Instant::now() + ttl);
            }
        }
        Ok(next)
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.incr_inner(key, None)
    }

    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        self.incr_inner(key, Some(ttl))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut keyspace = self.inner.keyspace.lock();
        match keyspace.live(key) {
            None => Ok(None),
            Some(Slot {
                value: Value::Str(raw),
                ..
            }) => Ok(Some(raw.clone())),
            Some(_) => Err(wrong_type(key, "string")),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.keyspace.lock().slots.insert(
            key.to_string(),
            Slot {
                value: Value::Str(value.to_string()),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.keyspace.lock().slots.remove(key);
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut keyspace = self.inner.keyspace.lock();
        Ok(keyspace
            .live(key)
            .and_then(|slot| slot.expires_at)
            .map(|deadline| deadline.saturating_duration_since(Instant::now())))
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut keyspace = self.inner.keyspace.lock();
        match keyspace.live(key) {
            None => Ok(None),
            Some(Slot {
                value: Value::Hash(hash),
                ..
            }) => Ok(hash.get(field).cloned()),
            Some(_) => Err(wrong_type(key, "hash")),
        }
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut keyspace = self.inner.keyspace.lock();
        if keyspace.live(key).is_none() {
            keyspace.slots.insert(
                key.to_string(),
                Slot {
                    value: Value::Hash(HashMap::new()),
                    expires_at: None,
                },
            );
        }
        match keyspace.slots.get_mut(key) {
            Some(Slot {
                value: Value::Hash(hash),
                ..
            }) => {
                hash.insert(field.to_string(), value.to_string());
                Ok(())
            }
            _ => Err(wrong_type(key, "hash")),
        }
    }

    async fn push_tail(&self, key: &str, value: &str) -> Result<(), StoreError> {
        {
            let mut keyspace = self.inner.keyspace.lock();
            if keyspace.live(key).is_none() {
                keyspace.slots.insert(
                    key.to_string(),
                    Slot {
                        value: Value::List(VecDeque::new()),
                        expires_at: None,
                    },
                );
            }
            match keyspace.list_mut(key)? {
                Some(list) => list.push_back(value.to_string()),
                None => return Err(wrong_type(key, "list")),
            }
        }
        self.inner.pushed.notify_waiters();
        Ok(())
    }

    async fn pop_head(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.keyspace.lock().pop_head(key)
    }

    async fn blocking_pop_head(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<Option<String>, StoreError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register interest before checking so a push between the check
            // and the await is not missed.
            let notified = self.inner.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let popped = self.inner.keyspace.lock().pop_head(key)?;
            if popped.is_some() {
                return Ok(popped);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn list_len(&self, key: &str) -> Result<usize, StoreError> {
        let mut keyspace = self.inner.keyspace.lock();
        Ok(keyspace.list_mut(key)?.map(|list| list.len()).unwrap_or(0))
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut keyspace = self.inner.keyspace.lock();
        Ok(keyspace
            .list_mut(key)?
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }
}
