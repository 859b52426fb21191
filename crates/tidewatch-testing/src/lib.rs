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

//! # Tidewatch Testing
//!
//! In-memory stand-ins for the external collaborators of a
//! [`Watcher`](tidewatch::Watcher): an oplog, a target collection, handlers
//! that record or fail, and an event recorder. Combined with
//! [`MemoryStore`](tidewatch::MemoryStore) and
//! [`TokioClock`](tidewatch::TokioClock) they allow whole fleets of watchers
//! to run under `tokio::time::pause()` without Redis or MongoDB.

mod collection;
mod events;
mod handler;
mod oplog;

pub use collection::MemoryCollection;
pub use events::EventRecorder;
pub use handler::RecordingHandler;
pub use oplog::MemoryOplog;
