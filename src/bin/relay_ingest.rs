//! Activity Relay Ingest Server
//!
//! Receives buckets and events over HTTP and stores them in PostgreSQL.
//!
//! # Usage
//!
//! ```bash
//! # DSN from the environment, port 8080
//! DSN=postgres://relay@localhost/activity relay-ingest
//!
//! # Explicit DSN and port
//! relay-ingest --dsn "host=db user=relay dbname=activity" --port 9000
//! ```

use std::sync::Arc;

use activity_relay::server::{start_server, ServerConfig};
use activity_relay::sync::{PostgresSink, Sink};
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relay-ingest")]
#[command(version, about = "HTTP ingest service for activity-relay")]
struct Args {
    /// PostgreSQL connection string
    #[arg(long, env = "DSN")]
    dsn: String,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// PostgreSQL pool size
    #[arg(long, default_value_t = 16)]
    pool_size: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info,tower_http=debug" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(false)
        .init();

    let sink = PostgresSink::connect(&args.dsn, args.pool_size)
        .await
        .context("Could not connect to database")?;

    tracing::info!("Running data migrations...");
    sink.run_migrations()
        .await
        .context("Failed to run migrations")?;

    let config = ServerConfig {
        port: args.port,
        host: args.host,
    };

    start_server(config, Arc::new(sink))
        .await
        .context("Server failed")?;

    Ok(())
}
