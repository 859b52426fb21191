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

//! Configuration types for the watcher.
//!
//! All timing values are whole-second granularity at the shared-state level:
//! stats are persisted as seconds and the clock reports seconds.

use std::time::Duration;

use crate::error::ConfigError;

/// Configuration for a [`Watcher`](crate::worker::Watcher).
///
/// # Construction
///
/// ```rust
/// use std::time::Duration;
/// use tidewatch::config::WatcherConfig;
///
/// let config = WatcherConfig::builder()
///     .page_size(100)
///     .window_interval(Duration::from_secs(5))
///     .build()
///     .unwrap();
/// assert_eq!(config.page_size(), 100);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct WatcherConfig {
    window_interval: Duration,
    page_size: u64,
    queue_wait: Duration,
    admin_lease_ttl: Duration,
    max_attempts: u32,
    key_namespace: String,
    store_error_backoff: Duration,
    worker_id: String,
}

impl WatcherConfig {
    /// Creates a new configuration builder with default values.
    pub fn builder() -> WatcherConfigBuilder {
        WatcherConfigBuilder::default()
    }

    /// Minimum spacing between two scans of the same scope.
    pub fn window_interval(&self) -> Duration {
        self.window_interval
    }

    /// Window interval in whole seconds, as used in persisted stats.
    pub fn window_interval_secs(&self) -> i64 {
        self.window_interval.as_secs() as i64
    }

    /// Log entries per work item.
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// How long an idle worker blocks on the queue after electing or waiting.
    pub fn queue_wait(&self) -> Duration {
        self.queue_wait
    }

    /// Lifetime of an admin lease that is never released.
    pub fn admin_lease_ttl(&self) -> Duration {
        self.admin_lease_ttl
    }

    /// Execution attempts before an item is dead-lettered.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Prefix of every shared-store key.
    pub fn key_namespace(&self) -> &str {
        &self.key_namespace
    }

    /// Pause before re-entering `Idle` after a coordination-store failure.
    pub fn store_error_backoff(&self) -> Duration {
        self.store_error_backoff
    }

    /// Identifier carried by lifecycle events.
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }
}

/// Builder for [`WatcherConfig`].
#[derive(Debug, Clone)]
pub struct WatcherConfigBuilder {
    config: WatcherConfig,
}

impl Default for WatcherConfigBuilder {
    fn default() -> Self {
        Self {
            config: WatcherConfig {
                window_interval: Duration::from_secs(2),
                page_size: 50,
                queue_wait: Duration::from_secs(5),
                admin_lease_ttl: Duration::from_secs(60),
                max_attempts: 5,
                key_namespace: "tidewatch".to_string(),
                store_error_backoff: Duration::from_secs(1),
                worker_id: format!("pid-{}", std::process::id()),
            },
        }
    }
}

impl WatcherConfigBuilder {
    pub fn window_interval(mut self, value: Duration) -> Self {
        self.config.window_interval = value;
        self
    }

    pub fn page_size(mut self, value: u64) -> Self {
        self.config.page_size = value;
        self
    }

    pub fn queue_wait(mut self, value: Duration) -> Self {
        self.config.queue_wait = value;
        self
    }

    pub fn admin_lease_ttl(mut self, value: Duration) -> Self {
        self.config.admin_lease_ttl = value;
        self
    }

    pub fn max_attempts(mut self, value: u32) -> Self {
        self.config.max_attempts = value;
        self
    }

    pub fn key_namespace(mut self, value: impl Into<String>) -> Self {
        self.config.key_namespace = value.into();
        self
    }

    pub fn store_error_backoff(mut self, value: Duration) -> Self {
        self.config.store_error_backoff = value;
        self
    }

    pub fn worker_id(mut self, value: impl Into<String>) -> Self {
        self.config.worker_id = value.into();
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<WatcherConfig, ConfigError> {
        let config = self.config;
        if config.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if config.window_interval.as_secs() == 0 {
            return Err(ConfigError::ZeroWindowInterval);
        }
        if config.max_attempts == 0 {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        // Idle workers pace themselves on the blocking claim.
        if config.queue_wait.is_zero() {
            return Err(ConfigError::ZeroQueueWait);
        }
        // The lease must outlive the throttle sleep plus the scan itself.
        if config.admin_lease_ttl <= config.window_interval {
            return Err(ConfigError::LeaseShorterThanWindow {
                ttl: config.admin_lease_ttl,
                window: config.window_interval,
            });
        }
        if config.key_namespace.is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        Ok(config)
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        WatcherConfigBuilder::default().config
    }
}
