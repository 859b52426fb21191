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

//! # Tidewatch
//!
//! Coordinates a fleet of worker processes that consume a database change log
//! (oplog) for one collection. Work is shared through an external store so
//! any number of processes can cooperate on the same scope.
//!
//! ## Key Features
//!
//! - Leader election per scan window through a TTL-bounded admin lease
//! - Throttled window scans split into fixed-size page work items
//! - A shared FIFO work queue with blocking claims
//! - Attempt counting with requeue and dead-lettering after a limit
//! - Synchronous lifecycle events for observability
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tidewatch::{CoordinationScope, RedisClock, RedisStore, Watcher, WatcherConfig};
//!
//! let store = RedisStore::connect("redis://127.0.0.1/").await?;
//! let watcher = Watcher::new(
//!     CoordinationScope::new("main", "shop", "orders")?,
//!     WatcherConfig::default(),
//!     Arc::new(store.clone()),
//!     Arc::new(RedisClock::new(store)),
//!     oplog,
//!     orders,
//!     Arc::new(|changes: Vec<ChangeRecord>| async move {
//!         println!("{} changes", changes.len());
//!         Ok(())
//!     }),
//! );
//! watcher.on(WatchEvent::ErrorProcessing, |payload| eprintln!("{:?}", payload.error));
//! let handle = watcher.start();
//! ```

pub mod clock;
pub mod config;
pub mod enumerator;
pub mod error;
pub mod events;
pub mod ledger;
pub mod lock;
pub mod queue;
pub mod scope;
pub mod stats;
pub mod store;
pub mod window;
pub mod worker;

pub use clock::{Clock, SystemClock, TokioClock};
pub use config::{WatcherConfig, WatcherConfigBuilder};
pub use enumerator::{
    ChangeRecord, LogEnumerator, Operation, RawLogEntry, ScanRangeQuery, TargetCollection,
};
pub use error::{
    ConfigError, CoordinationError, ExecutionError, HandlerError, LedgerError, LogStoreError,
    StoreError,
};
pub use events::{EventPayload, EventRegistry, WatchEvent};
pub use ledger::RetryLedger;
pub use lock::AdminLock;
pub use queue::{WorkItem, WorkQueue};
pub use scope::{CoordinationScope, ScopeKeys};
pub use stats::{QueueStats, ResolvedStats, StatsRepository};
pub use store::{MemoryStore, SharedStore};
#[cfg(feature = "redis")]
pub use store::{RedisClock, RedisStore};
pub use window::{WindowOutcome, WindowScheduler};
pub use worker::{ChangeHandler, StopHandle, Watcher, WorkerState};
