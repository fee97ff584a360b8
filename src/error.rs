//! Error types for activity-relay

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Source database not found: {0}")]
    SourceNotFound(String),

    #[error("Source database error: {0}")]
    Source(#[from] rusqlite::Error),

    #[error("Malformed timestamp in {table} row {row}: {value:?} ({source})")]
    Timestamp {
        table: &'static str,
        row: i64,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Unsupported database type: {0:?} (expected one of: pg, postgres, postgresql)")]
    UnsupportedDbType(String),

    #[error("Sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Migration {version} ({name}) failed: {source}")]
    Migration {
        version: i32,
        name: &'static str,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid concurrency {0}: at least one worker is required")]
    InvalidConcurrency(usize),

    #[error("Run exceeded deadline of {0:?}")]
    Timeout(Duration),

    #[error("Worker failed: {0}")]
    Worker(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio::task::JoinError> for RelayError {
    fn from(err: tokio::task::JoinError) -> Self {
        RelayError::Worker(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
