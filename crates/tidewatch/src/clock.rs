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

//! Authoritative time sources.
//!
//! Workers on different machines may disagree about the local time, so every
//! scheduling decision reads "now" through a [`Clock`]. Production
//! deployments should use a clock shared by all workers, such as
//! [`RedisClock`](crate::store::RedisClock).

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::StoreError;

/// Supplies the current time in whole seconds since the Unix epoch.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn now(&self) -> Result<i64, StoreError>;
}

/// Local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    async fn now(&self) -> Result<i64, StoreError> {
        Ok(chrono::Utc::now().timestamp())
    }
}

/// Clock anchored at a fixed epoch timestamp and advanced by tokio's timer.
///
/// Because throttle delays and blocking dequeues also run on tokio's timer,
/// this clock stays coherent with them under `tokio::time::pause()`.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    anchor_timestamp: i64,
    anchor_instant: Instant,
}

impl TokioClock {
    /// Starts the clock at `timestamp` seconds.
    pub fn starting_at(timestamp: i64) -> Self {
        Self {
            anchor_timestamp: timestamp,
            anchor_instant: Instant::now(),
        }
    }

    /// Starts the clock at the current wall-clock time.
    pub fn from_system() -> Self {
        Self::starting_at(chrono::Utc::now().timestamp())
    }

    fn current(&self) -> i64 {
        self.anchor_timestamp + self.anchor_instant.elapsed().as_secs() as i64
    }
}

#[async_trait]
impl Clock for TokioClock {
    async fn now(&self) -> Result<i64, StoreError> {
        Ok(self.current())
    }
}
