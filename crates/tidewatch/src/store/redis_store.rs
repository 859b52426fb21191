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

//! Redis-backed [`SharedStore`] and [`Clock`].
//!
//! Connections go through a [`ConnectionManager`], which reconnects
//! transparently. Blocking pops use a second manager, opened on first use and
//! shared by every clone, so a waiting `BLPOP` never stalls other commands
//! issued by the same process.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::aio::ConnectionManager;
use redis::Script;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::SharedStore;
use crate::clock::Clock;
use crate::error::StoreError;

/// `INCR`, then `PEXPIRE` iff the increment created the key.
static INCR_WITH_EXPIRY: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
        local value = redis.call('INCR', KEYS[1])
        if value == 1 then
            redis.call('PEXPIRE', KEYS[1], ARGV[1])
        end
        return value
        "#,
    )
});

/// Upper bound for one `BLPOP` round-trip; longer waits are issued as a
/// sequence of slices so client-side response timeouts never fire.
const BLPOP_SLICE: Duration = Duration::from_millis(400);

/// [`SharedStore`] over a Redis server.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    conn: ConnectionManager,
    blocking: Arc<OnceCell<ConnectionManager>>,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("connection", &"ConnectionManager")
            .field("blocking_connection", &self.blocking.initialized())
            .finish()
    }
}

impl RedisStore {
    /// Connects to the Redis server at `redis_url`.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        info!("Connecting to Redis shared store at {}", redis_url);

        let client = redis::Client::open(redis_url)
            .map_err(|e| StoreError::backend("connect", e))?;
        let conn = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| StoreError::backend("connect", e))?;

        info!("Connected to Redis shared store");
        Ok(Self {
            client,
            conn,
            blocking: Arc::new(OnceCell::new()),
        })
    }

    /// Whether the dedicated blocking-pop connection has been opened.
    pub fn has_blocking_connection(&self) -> bool {
        self.blocking.initialized()
    }

    async fn blocking_connection(&self) -> Result<ConnectionManager, StoreError> {
        let conn = self
            .blocking
            .get_or_try_init(|| async {
                debug!("Opening dedicated Redis connection for blocking pops");
                ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(|e| StoreError::backend("connect", e))
            })
            .await?;
        Ok(conn.clone())
    }

    /// Reads the server's clock (`TIME`), in whole seconds.
    pub async fn server_time(&self) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        let (seconds, _micros): (i64, i64) = redis::cmd("TIME")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::backend("TIME", e))?;
        Ok(seconds)
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("INCR")
            .arg(key)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| StoreError::backend("INCR", e))
    }

    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        INCR_WITH_EXPIRY
            .key(key)
            .arg(ttl.as_millis() as u64)
            .invoke_async::<i64>(&mut conn)
            .await
            .map_err(|e| StoreError::backend("INCR+PEXPIRE", e))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(|e| StoreError::backend("GET", e))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| StoreError::backend("SET", e))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| StoreError::backend("DEL", e))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut conn = self.conn.clone();
        let millis: i64 = redis::cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::backend("PTTL", e))?;
        // -2: missing, -1: no expiry
        Ok((millis >= 0).then(|| Duration::from_millis(millis as u64)))
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("HGET")
            .arg(key)
            .arg(field)
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(|e| StoreError::backend("HGET", e))
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("HSET")
            .arg(key)
            .arg(field)
            .arg(value)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| StoreError::backend("HSET", e))
    }

    async fn push_tail(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("RPUSH")
            .arg(key)
            .arg(value)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| StoreError::backend("RPUSH", e))
    }

    async fn pop_head(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("LPOP")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(|e| StoreError::backend("LPOP", e))
    }

    async fn blocking_pop_head(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<Option<String>, StoreError> {
        let mut conn = self.blocking_connection().await?;

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                debug!("BLPOP on {} timed out after {:?}", key, timeout);
                return Ok(None);
            }

            // BLPOP treats 0 as "block forever", so never send it.
            let slice = remaining.min(BLPOP_SLICE).max(Duration::from_millis(10));
            let popped: Option<(String, String)> = redis::cmd("BLPOP")
                .arg(key)
                .arg(slice.as_secs_f64())
                .query_async(&mut conn)
                .await
                .map_err(|e| StoreError::backend("BLPOP", e))?;

            if let Some((_list, value)) = popped {
                return Ok(Some(value));
            }
        }
    }

    async fn list_len(&self, key: &str) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("LLEN")
            .arg(key)
            .query_async::<usize>(&mut conn)
            .await
            .map_err(|e| StoreError::backend("LLEN", e))
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("LRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .query_async::<Vec<String>>(&mut conn)
            .await
            .map_err(|e| StoreError::backend("LRANGE", e))
    }
}

/// [`Clock`] reading the Redis server's `TIME`, shared by every worker
/// connected to the same server.
#[derive(Debug, Clone)]
pub struct RedisClock {
    store: RedisStore,
}

impl RedisClock {
    pub fn new(store: RedisStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Clock for RedisClock {
    async fn now(&self) -> Result<i64, StoreError> {
        self.store.server_time().await
    }
}
