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

//! Implementation of the `lease release` command.
//!
//! A leader that dies mid-scan holds the lease until its TTL expires.
//! Releasing it by hand lets the next worker scan right away.

use anyhow::{Context, Result};
use tracing::info;

use super::Target;

/// Run the `lease release` command. Returns whether a lease was held.
pub async fn release(target: &Target) -> Result<bool> {
    let lock = target.lock();
    let remaining = lock
        .remaining()
        .await
        .context("Failed to read admin lease")?;

    lock.release()
        .await
        .context("Failed to release admin lease")?;

    match remaining {
        None => {
            info!("Admin lease of {} was not held", target.scope);
            Ok(false)
        }
        Some(remaining) => {
            info!(
                "Released admin lease of {} ({}s were left)",
                target.scope,
                remaining.as_secs()
            );
            Ok(true)
        }
    }
}
