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

//! Implementation of the `dead-letters` commands.

use anyhow::{Context, Result};
use tracing::info;

use super::Target;

/// Run the `dead-letters list` command. Returns one stored payload per line,
/// undecodable ones included.
pub async fn list(target: &Target) -> Result<Vec<String>> {
    let payloads = target
        .queue()
        .dead_letter_payloads()
        .await
        .context("Failed to read dead letters")?;
    if payloads.is_empty() {
        info!("No dead-lettered items for {}", target.scope);
    }
    Ok(payloads)
}

/// Run the `dead-letters requeue` command.
pub async fn requeue(target: &Target) -> Result<usize> {
    let moved = target
        .queue()
        .requeue_dead_letters()
        .await
        .context("Failed to requeue dead letters")?;
    if moved == 0 {
        info!("No dead-lettered items for {}", target.scope);
    } else {
        info!(
            "Moved {} dead-lettered item(s) of {} back to the live queue",
            moved, target.scope
        );
    }
    Ok(moved)
}

/// Run the `dead-letters purge` command. Returns how many items were removed.
pub async fn purge(target: &Target, yes: bool) -> Result<usize> {
    let queue = target.queue();
    if !yes {
        let pending = queue
            .dead_letter_payloads()
            .await
            .context("Failed to read dead letters")?
            .len();
        info!(
            "[DRY RUN] Would purge {} dead-lettered item(s) of {}. Pass --yes to proceed",
            pending, target.scope
        );
        return Ok(0);
    }

    let purged = queue
        .purge_dead_letters()
        .await
        .context("Failed to purge dead letters")?;
    info!("Purged {} dead-lettered item(s) of {}", purged, target.scope);
    Ok(purged)
}
