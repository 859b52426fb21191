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
use serde_json::Value;
use tidewatch::{LogStoreError, TargetCollection};

/// A collection of JSON documents keyed by `_id`.
#[derive(Debug, Default)]
pub struct MemoryCollection {
    documents: Mutex<Vec<Value>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `doc`, replacing any document with the same `_id`.
    pub fn upsert(&self, doc: Value) {
        let mut documents = self.documents.lock();
        let id = doc.get("_id").cloned();
        documents.retain(|existing| existing.get("_id").cloned() != id);
        documents.push(doc);
    }

    pub fn remove(&self, id: &Value) {
        self.documents
            .lock()
            .retain(|existing| existing.get("_id") != Some(id));
    }

    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.lock().is_empty()
    }
}

#[async_trait]
impl TargetCollection for MemoryCollection {
    async fn find_by_ids(&self, ids: &[Value]) -> Result<Vec<Value>, LogStoreError> {
        Ok(self
            .documents
            .lock()
            .iter()
            .filter(|doc| doc.get("_id").is_some_and(|id| ids.contains(id)))
            .cloned()
            .collect())
    }
}
