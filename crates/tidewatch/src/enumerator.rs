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

//! Log store seam: scan-range queries, pagination and hydration.
//!
//! The oplog itself and the watched collection are external collaborators.
//! This module fixes the shapes the coordinator exchanges with them and
//! provides the grouping/hydration logic that turns raw oplog entries into
//! the [`ChangeRecord`]s handed to user handlers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LogStoreError;
use crate::queue::WorkItem;

/// A `(from, to]` time range over one namespace of the oplog.
///
/// Immutable once built; every page of one scan window carries the same query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanRangeQuery {
    /// Oplog namespace, `database.collection`.
    pub namespace: String,
    /// Entries must be strictly newer than this timestamp (open when absent).
    pub from_exclusive: Option<i64>,
    /// Entries must be at or older than this timestamp (open when absent).
    pub to_inclusive: Option<i64>,
}

impl ScanRangeQuery {
    pub fn build(
        database: &str,
        collection: &str,
        from_exclusive: Option<i64>,
        to_inclusive: Option<i64>,
    ) -> Self {
        Self {
            namespace: format!("{}.{}", database, collection),
            from_exclusive,
            to_inclusive,
        }
    }

    /// Whether an entry with namespace `ns` and timestamp `ts` falls in range.
    pub fn matches(&self, ns: &str, ts: i64) -> bool {
        ns == self.namespace
            && self.from_exclusive.map_or(true, |from| ts > from)
            && self.to_inclusive.map_or(true, |to| ts <= to)
    }
}

/// One raw oplog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLogEntry {
    /// Timestamp in seconds.
    pub ts: i64,
    /// Namespace the change applies to.
    pub ns: String,
    /// Operation code (`i`, `u`, `d`, `c`, `n`).
    pub op: String,
    /// Operation document: the inserted document, the update document, or the
    /// deleted document's id.
    pub o: Value,
    /// Update selector; carries the target `_id` for updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub o2: Option<Value>,
}

/// Kind of change an oplog entry records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Insert,
    Update,
    Delete,
    Command,
    Noop,
    /// Any code this crate does not know, preserved verbatim.
    Other(String),
}

impl Operation {
    pub fn from_code(code: &str) -> Self {
        match code {
            "i" => Operation::Insert,
            "u" => Operation::Update,
            "d" => Operation::Delete,
            "c" => Operation::Command,
            "n" => Operation::Noop,
            other => Operation::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Operation::Insert => "i",
            Operation::Update => "u",
            Operation::Delete => "d",
            Operation::Command => "c",
            Operation::Noop => "n",
            Operation::Other(code) => code,
        }
    }
}

/// A hydrated change, as delivered to handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// `_id` of the changed document.
    pub id: Value,
    /// The `$set` portion of an update, or the whole operation document.
    pub diff: Value,
    pub operation: Operation,
    /// Current state of the document; `None` when it no longer exists.
    pub doc: Option<Value>,
}

impl ChangeRecord {
    /// Groups a raw entry into a change without its current document.
    ///
    /// The diff is `o.$set` when present, otherwise `o`. The id comes from
    /// `o2._id` when present (updates), otherwise `o._id`.
    pub fn from_entry(entry: &RawLogEntry) -> Self {
        let diff = entry
            .o
            .get("$set")
            .cloned()
            .unwrap_or_else(|| entry.o.clone());
        let id = entry
            .o2
            .as_ref()
            .and_then(|o2| o2.get("_id"))
            .or_else(|| entry.o.get("_id"))
            .cloned()
            .unwrap_or(Value::Null);

        Self {
            id,
            diff,
            operation: Operation::from_code(&entry.op),
            doc: None,
        }
    }
}

/// Read access to the watched collection, used to hydrate changes with the
/// documents' current state.
#[async_trait]
pub trait TargetCollection: Send + Sync {
    /// Fetches every document whose `_id` is in `ids`. Missing ids are
    /// simply absent from the result.
    async fn find_by_ids(&self, ids: &[Value]) -> Result<Vec<Value>, LogStoreError>;
}

/// Counts and paginates oplog entries for a scan range.
#[async_trait]
pub trait LogEnumerator: Send + Sync {
    /// Builds the query for `(from_exclusive, to_inclusive]` over
    /// `database.collection`.
    fn build_scan_query(
        &self,
        database: &str,
        collection: &str,
        from_exclusive: Option<i64>,
        to_inclusive: Option<i64>,
    ) -> ScanRangeQuery {
        ScanRangeQuery::build(database, collection, from_exclusive, to_inclusive)
    }

    /// Number of entries matching `query`.
    async fn count(&self, query: &ScanRangeQuery) -> Result<u64, LogStoreError>;

    /// Entries of page `page` (1-based): skips `(page - 1) * page_size`
    /// entries and returns at most `page_size`.
    async fn paginate(
        &self,
        query: &ScanRangeQuery,
        page: u64,
        page_size: u64,
    ) -> Result<Vec<RawLogEntry>, LogStoreError>;

    /// Groups `entries` into changes and attaches each document's current
    /// state from `target`.
    async fn hydrate(
        &self,
        entries: Vec<RawLogEntry>,
        target: &dyn TargetCollection,
    ) -> Result<Vec<ChangeRecord>, LogStoreError> {
        let mut changes: Vec<ChangeRecord> = entries.iter().map(ChangeRecord::from_entry).collect();
        if changes.is_empty() {
            return Ok(changes);
        }

        let ids: Vec<Value> = changes.iter().map(|change| change.id.clone()).collect();
        let documents = target.find_by_ids(&ids).await?;

        for change in &mut changes {
            change.doc = documents
                .iter()
                .find(|doc| doc.get("_id") == Some(&change.id))
                .cloned();
        }
        Ok(changes)
    }

    /// Retrieves and hydrates the page described by `item`.
    async fn fetch_changes(
        &self,
        item: &WorkItem,
        target: &dyn TargetCollection,
    ) -> Result<Vec<ChangeRecord>, LogStoreError> {
        let entries = self
            .paginate(&item.query, item.page, item.page_size)
            .await?;
        self.hydrate(entries, target).await
    }
}
