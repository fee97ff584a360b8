//! Activity Relay - ship ActivityWatch data to PostgreSQL or an ingest service
//!
//! `init` performs a full load; `sync` forwards only records from the last
//! `interval` seconds and is meant to run on a schedule.

use std::path::PathBuf;

use activity_relay::sync::{Relay, RelayConfig, RelayEvent, RunSummary};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::{style, Emoji};
use tracing_subscriber::EnvFilter;

static CHECK: Emoji = Emoji("✓ ", "* ");
static ARROW: Emoji = Emoji("→ ", "-> ");
static WARN: Emoji = Emoji("⚠ ", "! ");

#[derive(Parser)]
#[command(name = "activity-relay")]
#[command(version, about = "Ship ActivityWatch buckets and events to a remote sink")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.config/activity-relay/relay.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the run deadline, in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the initial full load
    Init {
        /// Sink database type (pg); ignored for http(s) targets
        db_type: String,

        /// Path to the ActivityWatch SQLite database
        source_path: PathBuf,

        /// Connection string or http(s):// base URL
        target: String,

        /// Number of concurrent event writers
        concurrency: usize,
    },

    /// Forward records from the last INTERVAL seconds
    Sync {
        /// Sink database type (falls back to `db_type` in the config file)
        db_type: Option<String>,

        /// Path to the ActivityWatch SQLite database (falls back to `source_path`)
        source_path: Option<PathBuf>,

        /// Connection string or http(s):// base URL (falls back to `target`)
        target: Option<String>,

        /// Look-back window in seconds (falls back to `interval_secs`)
        interval: Option<u64>,

        /// Number of concurrent event writers (falls back to `concurrency`)
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into()))
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => RelayConfig::from_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => RelayConfig::load(),
    };
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }

    let mut relay = Relay::with_settings(config.run_settings());
    relay.on_event(print_progress);

    let summary = match cli.command {
        Commands::Init {
            db_type,
            source_path,
            target,
            concurrency,
        } => relay
            .initialize(&db_type, &source_path, &target, concurrency)
            .await
            .context("Error during initialization")?,

        Commands::Sync {
            db_type,
            source_path,
            target,
            interval,
            concurrency,
        } => {
            let db_type = db_type.or(config.db_type.clone()).unwrap_or_default();
            let source_path = source_path
                .or(config.source_path.clone())
                .context(missing("source path", "source_path"))?;
            let target = target
                .or(config.target.clone())
                .context(missing("target", "target"))?;
            let interval = interval
                .or(config.interval_secs)
                .context(missing("interval", "interval_secs"))?;
            let concurrency = concurrency.unwrap_or(config.concurrency);

            relay
                .sync(&db_type, &source_path, &target, interval, concurrency)
                .await
                .context("Error during sync")?
        }
    };

    print_summary(&summary);
    Ok(())
}

fn missing(what: &str, key: &str) -> String {
    format!("No {what} given: pass it as an argument or set `{key}` in the config file")
}

fn print_progress(event: RelayEvent) {
    match event {
        RelayEvent::Started { mode, target } => {
            println!("{}{} {}", ARROW, style(mode.name()).bold(), style(target).dim());
        }
        RelayEvent::Migrated { applied } => {
            println!("{}Applied {} migrations", CHECK, applied);
        }
        RelayEvent::Extracted { buckets, events } => {
            println!("{}Read {} buckets and {} events", CHECK, buckets, events);
        }
        RelayEvent::Dispatched(_) => {}
        RelayEvent::Failed { error } => {
            eprintln!("{}{}", WARN, style(error).red());
        }
    }
}

fn print_summary(summary: &RunSummary) {
    let report = &summary.report;
    println!(
        "{}{} buckets and {} events attempted in {:.2}s",
        CHECK,
        style(report.buckets_attempted).green(),
        style(report.events_attempted).green(),
        summary.duration.as_secs_f64()
    );

    if let Some(since) = summary.window_start {
        println!("  Window start: {}", since.to_rfc3339());
    }

    let failed = report.buckets_failed() + report.events_failed();
    if failed > 0 {
        println!(
            "{}{} records failed ({} buckets, {} events); see log for details",
            WARN,
            style(failed).yellow(),
            report.buckets_failed(),
            report.events_failed()
        );
    }
}
