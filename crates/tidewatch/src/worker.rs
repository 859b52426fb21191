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

//! The per-process worker loop.
//!
//! A [`Watcher`] repeatedly tries to claim a work item. When the queue is
//! empty it competes for the admin lease; the winner scans the next window
//! and refills the queue, everyone else waits on the queue. Claimed items
//! run through the [`RetryLedger`] and the user's [`ChangeHandler`].
//!
//! ```text
//! Idle -> Claiming -> ElectingAdmin -> Scanning -> Claiming -> Idle
//!            |                                        |
//!            +----------------> Executing <-----------+
//! ```
//!
//! Stopping is cooperative. [`StopHandle::stop`] sets a flag that is only
//! checked once the current unit of work (an execution, or a claim attempt
//! including its blocking wait) has finished.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::clock::Clock;
use crate::config::WatcherConfig;
use crate::enumerator::{ChangeRecord, LogEnumerator, TargetCollection};
use crate::error::{CoordinationError, ExecutionError, HandlerError, LedgerError};
use crate::events::{EventPayload, EventRegistry, WatchEvent};
use crate::ledger::RetryLedger;
use crate::lock::AdminLock;
use crate::queue::{WorkItem, WorkQueue};
use crate::scope::CoordinationScope;
use crate::store::SharedStore;
use crate::window::WindowScheduler;

/// Processes one hydrated page of changes.
///
/// Implemented for any `Fn(Vec<ChangeRecord>) -> impl Future<Output =
/// Result<(), HandlerError>>`, so plain async closures work as handlers.
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    async fn handle(&self, changes: Vec<ChangeRecord>) -> Result<(), HandlerError>;
}

#[async_trait]
impl<F, Fut> ChangeHandler for F
where
    F: Fn(Vec<ChangeRecord>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, changes: Vec<ChangeRecord>) -> Result<(), HandlerError> {
        (self)(changes).await
    }
}

/// Where the worker loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    Idle,
    Claiming,
    ElectingAdmin,
    Scanning,
    Executing,
    Stopped,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Idle => "idle",
            WorkerState::Claiming => "claiming",
            WorkerState::ElectingAdmin => "electing_admin",
            WorkerState::Scanning => "scanning",
            WorkerState::Executing => "executing",
            WorkerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Requests a cooperative stop of a running watcher.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// What to do after one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Halt,
}

/// A worker watching one coordination scope.
///
/// Cloning is cheap and every clone drives the same state, events and stop
/// flag.
#[derive(Clone)]
pub struct Watcher {
    scope: CoordinationScope,
    config: WatcherConfig,
    queue: WorkQueue,
    lock: AdminLock,
    scheduler: WindowScheduler,
    ledger: RetryLedger,
    enumerator: Arc<dyn LogEnumerator>,
    target: Arc<dyn TargetCollection>,
    handler: Arc<dyn ChangeHandler>,
    events: EventRegistry,
    state: Arc<RwLock<WorkerState>>,
    stop: StopHandle,
}

impl Watcher {
    pub fn new(
        scope: CoordinationScope,
        config: WatcherConfig,
        store: Arc<dyn SharedStore>,
        clock: Arc<dyn Clock>,
        enumerator: Arc<dyn LogEnumerator>,
        target: Arc<dyn TargetCollection>,
        handler: Arc<dyn ChangeHandler>,
    ) -> Self {
        let keys = scope.keys(config.key_namespace());
        Self {
            queue: WorkQueue::new(store.clone(), keys.clone()),
            lock: AdminLock::new(store.clone(), keys.clone(), config.admin_lease_ttl()),
            scheduler: WindowScheduler::new(
                scope.clone(),
                store.clone(),
                clock,
                enumerator.clone(),
                &config,
            ),
            ledger: RetryLedger::new(store, keys, config.max_attempts()),
            scope,
            config,
            enumerator,
            target,
            handler,
            events: EventRegistry::new(),
            state: Arc::new(RwLock::new(WorkerState::Idle)),
            stop: StopHandle::default(),
        }
    }

    pub fn scope(&self) -> &CoordinationScope {
        &self.scope
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    /// Registers an event listener. Returns `self` for chaining.
    pub fn on<F>(&self, event: WatchEvent, callback: F) -> &Self
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        self.events.on(event, callback);
        self
    }

    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Requests a cooperative stop.
    pub fn stop(&self) {
        info!("Stop requested for watcher on {}", self.scope);
        self.stop.stop();
    }

    /// Spawns [`run`](Self::run) on the current tokio runtime.
    pub fn start(&self) -> JoinHandle<()> {
        let watcher = self.clone();
        tokio::spawn(async move { watcher.run().await })
    }

    /// Drives the loop until a stop is requested. Failures are reported
    /// through events and logs only.
    pub async fn run(&self) {
        let span = info_span!(
            "watcher",
            worker = %self.config.worker_id(),
            scope = %self.scope
        );
        async {
            info!("Watcher started");
            while self.iterate().await == Flow::Continue {}
            info!("Watcher stopped");
        }
        .instrument(span)
        .await
    }

    async fn iterate(&self) -> Flow {
        self.set_state(WorkerState::Idle);

        let result = match self.claim().await {
            Ok(Some(item)) => self.execute(item).await,
            Ok(None) => {
                self.emit(WatchEvent::NoItems, self.payload());
                Ok(())
            }
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            error!("Coordination failure on {}: {}", self.scope, err);
            self.emit(WatchEvent::CoordinationError, self.payload().with_error(&err));
            if !self.stop.is_stop_requested() {
                tokio::time::sleep(self.config.store_error_backoff()).await;
            }
        }

        if self.stop.is_stop_requested() {
            self.set_state(WorkerState::Stopped);
            self.emit(WatchEvent::Stopped, self.payload());
            return Flow::Halt;
        }
        Flow::Continue
    }

    /// Tries to claim an item, electing an admin and scanning when the queue
    /// is empty.
    async fn claim(&self) -> Result<Option<WorkItem>, CoordinationError> {
        self.set_state(WorkerState::Claiming);
        if let Some(item) = self.queue.dequeue(Duration::ZERO).await? {
            return Ok(Some(item));
        }

        self.set_state(WorkerState::ElectingAdmin);
        if self.lock.try_become_admin().await? {
            self.emit(WatchEvent::SettingInstructions, self.payload());
            self.set_state(WorkerState::Scanning);
            let outcome = self.scheduler.run_window().await?;
            let event = if outcome.count > 0 {
                WatchEvent::InstructionsSet
            } else {
                WatchEvent::NoInstructions
            };
            self.emit(event, self.payload().with_outcome(outcome));
        } else {
            debug!("Admin lease held elsewhere, waiting on queue");
            self.emit(WatchEvent::WaitingInstructions, self.payload());
        }

        self.set_state(WorkerState::Claiming);
        Ok(self.queue.dequeue(self.config.queue_wait()).await?)
    }

    async fn execute(&self, item: WorkItem) -> Result<(), CoordinationError> {
        self.set_state(WorkerState::Executing);
        self.emit(WatchEvent::ReceiveItems, self.payload().with_item(item.clone()));

        let result = self
            .ledger
            .run_with_ledger(&item, || self.process(&item))
            .await;

        match result {
            Ok(()) => {
                debug!("Processed page {} of {}", item.page, item.query.namespace);
                Ok(())
            }
            Err(LedgerError::Execution {
                attempt,
                dead_lettered,
                source,
            }) => {
                warn!(
                    "Page {} failed on attempt {}: {}",
                    item.page, attempt, source
                );
                self.emit(
                    WatchEvent::ErrorProcessing,
                    self.payload()
                        .with_item(item.clone())
                        .with_error(&source)
                        .with_attempt(attempt),
                );
                if dead_lettered {
                    self.emit(
                        WatchEvent::DeadLettered,
                        self.payload().with_item(item).with_attempt(attempt),
                    );
                }
                Ok(())
            }
            Err(LedgerError::Store(err)) => Err(err.into()),
        }
    }

    /// Hydrates the page and hands it to the handler.
    async fn process(&self, item: &WorkItem) -> Result<(), ExecutionError> {
        let changes = self
            .enumerator
            .fetch_changes(item, self.target.as_ref())
            .await
            .map_err(|source| ExecutionError::Hydration {
                namespace: item.query.namespace.clone(),
                page: item.page,
                source,
            })?;
        self.handler
            .handle(changes)
            .await
            .map_err(ExecutionError::Handler)
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.write() = state;
    }

    fn payload(&self) -> EventPayload {
        EventPayload::new(self.config.worker_id())
    }

    fn emit(&self, event: WatchEvent, payload: EventPayload) {
        self.events.emit(event, &payload);
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("scope", &self.scope)
            .field("worker_id", &self.config.worker_id())
            .field("state", &self.state())
            .finish()
    }
}
