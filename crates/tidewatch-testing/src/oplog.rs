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
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use tidewatch::{LogEnumerator, LogStoreError, RawLogEntry, ScanRangeQuery};

/// An oplog held in memory, ordered by insertion.
#[derive(Debug, Default)]
pub struct MemoryOplog {
    entries: Mutex<Vec<RawLogEntry>>,
    failing_paginations: AtomicUsize,
    failing_counts: AtomicUsize,
    count_calls: AtomicUsize,
}

impl MemoryOplog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: RawLogEntry) {
        self.entries.lock().push(entry);
    }

    /// Records an insert of `doc` into `ns` at `ts`.
    pub fn insert(&self, ns: &str, ts: i64, doc: Value) {
        self.push(RawLogEntry {
            ts,
            ns: ns.to_string(),
            op: "i".to_string(),
            o: doc,
            o2: None,
        });
    }

    /// Records a `$set` update of document `id`.
    pub fn update(&self, ns: &str, ts: i64, id: Value, set: Value) {
        self.push(RawLogEntry {
            ts,
            ns: ns.to_string(),
            op: "u".to_string(),
            o: json!({ "$set": set }),
            o2: Some(json!({ "_id": id })),
        });
    }

    /// Records the deletion of document `id`.
    pub fn delete(&self, ns: &str, ts: i64, id: Value) {
        self.push(RawLogEntry {
            ts,
            ns: ns.to_string(),
            op: "d".to_string(),
            o: json!({ "_id": id }),
            o2: None,
        });
    }

    /// Makes the next `times` pagination calls fail.
    pub fn fail_next_paginations(&self, times: usize) {
        self.failing_paginations.store(times, Ordering::SeqCst);
    }

    /// Makes the next `times` count calls fail, as a lost log store would
    /// in the middle of a scan.
    pub fn fail_next_counts(&self, times: usize) {
        self.failing_counts.store(times, Ordering::SeqCst);
    }

    /// Number of `count` calls served, i.e. scans performed.
    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn matching(&self, query: &ScanRangeQuery) -> Vec<RawLogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| query.matches(&entry.ns, entry.ts))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LogEnumerator for MemoryOplog {
    async fn count(&self, query: &ScanRangeQuery) -> Result<u64, LogStoreError> {
        if take_one(&self.failing_counts) {
            return Err(LogStoreError::new("count", "injected failure"));
        }
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.matching(query).len() as u64)
    }

    async fn paginate(
        &self,
        query: &ScanRangeQuery,
        page: u64,
        page_size: u64,
    ) -> Result<Vec<RawLogEntry>, LogStoreError> {
        if take_one(&self.failing_paginations) {
            return Err(LogStoreError::new("paginate", "injected failure"));
        }

        let skip = page.saturating_sub(1).saturating_mul(page_size) as usize;
        Ok(self
            .matching(query)
            .into_iter()
            .skip(skip)
            .take(page_size as usize)
            .collect())
    }
}

/// Consumes one pending injected failure, if any.
fn take_one(pending: &AtomicUsize) -> bool {
    pending
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok()
}
