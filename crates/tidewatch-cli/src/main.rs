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

//! Tidewatch CLI - operator tooling for the shared coordination state of a
//! watched scope.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::Target;

/// Tidewatch - inspect and repair oplog coordination state
#[derive(Parser)]
#[command(name = "tidewatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Redis URL (can also be set via REDIS_URL environment variable)
    #[arg(long, env = "REDIS_URL", global = true)]
    redis_url: Option<String>,

    /// Prefix of every shared-store key
    #[arg(long, default_value = "tidewatch", global = true)]
    namespace: String,

    /// Cluster name of the watched scope
    #[arg(long, env = "TIDEWATCH_CLUSTER", global = true)]
    cluster: Option<String>,

    /// Database name of the watched scope
    #[arg(long, env = "TIDEWATCH_DATABASE", global = true)]
    database: Option<String>,

    /// Collection name of the watched scope
    #[arg(long, env = "TIDEWATCH_COLLECTION", global = true)]
    collection: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show scan progress, lease and queue state of the scope
    Stats {
        #[command(subcommand)]
        command: Option<StatsCommands>,
    },
    /// Inspect the live work queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Inspect and reprocess dead-lettered work items
    DeadLetters {
        #[command(subcommand)]
        command: DeadLetterCommands,
    },
    /// Manage the admin lease
    Lease {
        #[command(subcommand)]
        command: LeaseCommands,
    },
}

#[derive(Subcommand)]
enum StatsCommands {
    /// Forget scan progress; the next window starts from "now"
    Reset {
        /// Actually reset instead of reporting what would happen
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum QueueCommands {
    /// Number of items waiting in the live queue
    Depth,
}

#[derive(Subcommand)]
enum DeadLetterCommands {
    /// Print every dead-lettered item as JSON
    List,
    /// Move every dead-lettered item back to the live queue
    Requeue,
    /// Drop every dead-lettered item
    Purge {
        /// Actually purge instead of reporting what would happen
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum LeaseCommands {
    /// Release the admin lease held by a stuck leader
    Release,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let redis_url = cli
        .redis_url
        .context("Redis URL is required. Set --redis-url or REDIS_URL environment variable")?;
    let cluster = cli
        .cluster
        .context("Cluster is required. Set --cluster or TIDEWATCH_CLUSTER")?;
    let database = cli
        .database
        .context("Database is required. Set --database or TIDEWATCH_DATABASE")?;
    let collection = cli
        .collection
        .context("Collection is required. Set --collection or TIDEWATCH_COLLECTION")?;

    let target = Target::connect(&redis_url, &cli.namespace, &cluster, &database, &collection)
        .await?;

    match cli.command {
        Commands::Stats { command } => match command {
            None => {
                let report = commands::stats::run(&target).await?;
                println!("{}", report);
            }
            Some(StatsCommands::Reset { yes }) => {
                commands::stats::reset(&target, yes).await?;
            }
        },
        Commands::Queue { command } => match command {
            QueueCommands::Depth => {
                let depth = commands::queue::depth(&target).await?;
                println!("{}", depth);
            }
        },
        Commands::DeadLetters { command } => match command {
            DeadLetterCommands::List => {
                for line in commands::dead_letters::list(&target).await? {
                    println!("{}", line);
                }
            }
            DeadLetterCommands::Requeue => {
                commands::dead_letters::requeue(&target).await?;
            }
            DeadLetterCommands::Purge { yes } => {
                commands::dead_letters::purge(&target, yes).await?;
            }
        },
        Commands::Lease { command } => match command {
            LeaseCommands::Release => {
                commands::lease::release(&target).await?;
            }
        },
    }

    Ok(())
}
