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

//! Error types for the coordination engine.
//!
//! Failures are split by domain, matching the two recovery paths the worker
//! loop distinguishes:
//!
//! - [`StoreError`]: the shared store (queue, lease, stats, ledger) could not
//!   be reached or returned something unusable. Fatal to the current loop
//!   iteration only.
//! - [`ExecutionError`]: hydrating a page or running the user handler failed.
//!   Recovered by the retry ledger.
//!
//! [`LedgerError`] joins the two at the ledger boundary,
//! [`CoordinationError`] covers a failed claim/elect/scan step, and
//! [`ConfigError`] covers invalid watcher configuration.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by a [`SharedStore`](crate::store::SharedStore) backend or by
/// the typed layers that encode values into it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or rejected the command.
    #[error("Shared store command '{command}' failed: {message}")]
    Backend { command: String, message: String },

    /// A stored value could not be encoded or decoded.
    #[error("Failed to (de)serialize stored value under '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A stored value had an unexpected shape (e.g. a non-numeric timestamp).
    #[error("Corrupt value under '{key}': {message}")]
    Corrupt { key: String, message: String },
}

impl StoreError {
    /// Builds a [`StoreError::Backend`] from any displayable backend error.
    pub fn backend(command: impl Into<String>, err: impl std::fmt::Display) -> Self {
        StoreError::Backend {
            command: command.into(),
            message: err.to_string(),
        }
    }
}

/// Failure reported by the log store or the target collection (the external
/// oplog and data collaborators).
#[derive(Debug, Error)]
#[error("Log store operation '{operation}' failed: {message}")]
pub struct LogStoreError {
    pub operation: String,
    pub message: String,
}

impl LogStoreError {
    pub fn new(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

/// Error returned by a user-supplied change handler.
///
/// Handlers can return any error type; it is boxed so the coordinator stays
/// agnostic of the handler's own error taxonomy.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Transient failures while executing a work item.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Retrieving or hydrating the page from the log store failed.
    #[error("Failed to hydrate page {page} of {namespace}: {source}")]
    Hydration {
        namespace: String,
        page: u64,
        #[source]
        source: LogStoreError,
    },

    /// The user handler returned an error.
    #[error("Change handler failed: {0}")]
    Handler(#[source] HandlerError),
}

/// Failure of one worker-loop iteration outside of item execution.
///
/// These are never fatal to the loop: the worker logs them, emits
/// `coordination_error`, backs off and re-enters `Idle`. A leader that fails
/// mid-scan keeps the admin lease until its TTL expires.
#[derive(Debug, Error)]
pub enum CoordinationError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    LogStore(#[from] LogStoreError),
}

/// Outcome of a failed ledger-wrapped execution.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Bookkeeping against the shared store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The wrapped action failed; the item has been requeued or dead-lettered.
    #[error("Execution attempt {attempt} failed (dead-lettered: {dead_lettered}): {source}")]
    Execution {
        attempt: u32,
        dead_lettered: bool,
        #[source]
        source: ExecutionError,
    },
}

/// Invalid watcher configuration or coordination scope.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Page size must be greater than zero")]
    ZeroPageSize,

    #[error("Window interval must be at least one second")]
    ZeroWindowInterval,

    #[error("Max attempts must be at least 1")]
    ZeroMaxAttempts,

    #[error("Queue wait must be greater than zero")]
    ZeroQueueWait,

    #[error("Admin lease TTL ({ttl:?}) must exceed the window interval ({window:?})")]
    LeaseShorterThanWindow { ttl: Duration, window: Duration },

    #[error("Key namespace must not be empty")]
    EmptyNamespace,

    #[error("Scope segment '{segment}' is invalid: '{value}' (must be non-empty and contain no ':')")]
    InvalidScopeSegment { segment: &'static str, value: String },
}
