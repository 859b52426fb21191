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

//! Implementation of the `stats` and `stats reset` commands.

use anyhow::{Context, Result};
use chrono::DateTime;
use std::fmt;
use std::time::Duration;
use tidewatch::QueueStats;
use tracing::info;

use super::Target;

/// Snapshot of one scope's coordination state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsReport {
    pub scope: String,
    pub stats: QueueStats,
    pub lease_remaining: Option<Duration>,
    pub queue_depth: usize,
    pub dead_letters: usize,
}

fn format_timestamp(timestamp: Option<i64>) -> String {
    match timestamp {
        None => "never".to_string(),
        Some(ts) => match DateTime::from_timestamp(ts, 0) {
            Some(at) => format!("{} ({})", ts, at.to_rfc3339()),
            None => ts.to_string(),
        },
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "scope:             {}", self.scope)?;
        writeln!(
            f,
            "last timestamp:    {}",
            format_timestamp(self.stats.last_timestamp)
        )?;
        writeln!(
            f,
            "desired timestamp: {}",
            format_timestamp(self.stats.desired_timestamp)
        )?;
        match self.lease_remaining {
            Some(remaining) => writeln!(f, "admin lease:       held, {}s left", remaining.as_secs())?,
            None => writeln!(f, "admin lease:       free")?,
        }
        writeln!(f, "queue depth:       {}", self.queue_depth)?;
        write!(f, "dead letters:      {}", self.dead_letters)
    }
}

/// Run the `stats` command.
pub async fn run(target: &Target) -> Result<StatsReport> {
    let stats = target
        .stats()
        .load()
        .await
        .context("Failed to load queue stats")?;
    let lease_remaining = target
        .lock()
        .remaining()
        .await
        .context("Failed to read admin lease")?;
    let queue = target.queue();
    let queue_depth = queue.depth().await.context("Failed to read queue depth")?;
    let dead_letters = queue
        .dead_letter_payloads()
        .await
        .context("Failed to read dead letters")?
        .len();

    Ok(StatsReport {
        scope: target.scope.to_string(),
        stats,
        lease_remaining,
        queue_depth,
        dead_letters,
    })
}

/// Run the `stats reset` command. Returns whether the stats were reset.
pub async fn reset(target: &Target, yes: bool) -> Result<bool> {
    let stats = target.stats();
    let current = stats.load().await.context("Failed to load queue stats")?;

    if !yes {
        info!(
            "[DRY RUN] Would reset stats of {} (last timestamp: {}). Pass --yes to proceed",
            target.scope,
            format_timestamp(current.last_timestamp)
        );
        return Ok(false);
    }

    stats.reset().await.context("Failed to reset queue stats")?;
    info!(
        "Reset stats of {}; the next window starts from the current time",
        target.scope
    );
    Ok(true)
}
