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

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tidewatch::{ChangeHandler, ChangeRecord, HandlerError};

/// Handler that records every batch it receives and can be told to fail.
///
/// Failed calls are recorded too, so `calls()` counts every attempt.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    batches: Mutex<Vec<Vec<ChangeRecord>>>,
    calls: AtomicUsize,
    failures_left: AtomicUsize,
    always_fail: bool,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the first `times` calls, then succeeds.
    pub fn failing_times(times: usize) -> Self {
        let handler = Self::default();
        handler.failures_left.store(times, Ordering::SeqCst);
        handler
    }

    /// Fails every call.
    pub fn always_failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Batches delivered to successful calls.
    pub fn batches(&self) -> Vec<Vec<ChangeRecord>> {
        self.batches.lock().clone()
    }

    /// Every change delivered to successful calls, in delivery order.
    pub fn changes(&self) -> Vec<ChangeRecord> {
        self.batches.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl ChangeHandler for RecordingHandler {
    async fn handle(&self, changes: Vec<ChangeRecord>) -> Result<(), HandlerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let scheduled_failure = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if self.always_fail || scheduled_failure {
            return Err(format!("handler failure on call {}", call).into());
        }
        self.batches.lock().push(changes);
        Ok(())
    }
}
