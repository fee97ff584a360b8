//! Remote write targets.
//!
//! A sink accepts one bucket or one event at a time. The relational sink
//! upserts with `ON CONFLICT DO NOTHING`, so re-sending a record is a
//! no-op; the HTTP sink forwards to an ingest service and inherits whatever
//! idempotency that service provides.

pub mod http;
pub mod postgres;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use super::config::RunSettings;
use super::models::{Bucket, Event};
use crate::error::{RelayError, Result};

pub use http::HttpSink;
pub use postgres::PostgresSink;

/// Which variant a sink is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Relational,
    Http,
    /// Anything else (in-process sinks, test doubles)
    Other,
}

/// Capability interface shared by every sink
#[async_trait]
pub trait Sink: Send + Sync {
    fn kind(&self) -> SinkKind;

    /// Bring the target schema up to date. Returns the number of
    /// migrations applied.
    async fn run_migrations(&self) -> Result<usize>;

    async fn insert_bucket(&self, bucket: &Bucket) -> Result<()>;

    async fn insert_event(&self, event: &Event) -> Result<()>;
}

/// Relational databases the relay knows how to write to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    Postgres,
}

impl FromStr for DbType {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pg" | "postgres" | "postgresql" => Ok(DbType::Postgres),
            _ => Err(RelayError::UnsupportedDbType(s.to_string())),
        }
    }
}

/// A classified connection descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    /// Base URL of an ingest service
    Http { base_url: String },
    /// Database connection string
    Relational { db_type: DbType, conn_string: String },
}

impl SinkTarget {
    /// `http://` and `https://` targets go to the HTTP sink and ignore the
    /// database type. Everything else is a connection string and needs a
    /// recognized database type.
    pub fn classify(db_type: &str, target: &str) -> Result<Self> {
        if is_http_target(target) {
            return Ok(SinkTarget::Http {
                base_url: target.to_string(),
            });
        }

        Ok(SinkTarget::Relational {
            db_type: db_type.parse()?,
            conn_string: target.to_string(),
        })
    }

    /// Build the sink for this target. For PostgreSQL this checks out one
    /// connection, so an unreachable server fails here.
    pub async fn connect(&self, settings: &RunSettings) -> Result<Arc<dyn Sink>> {
        match self {
            SinkTarget::Http { base_url } => {
                let sink = HttpSink::new(base_url, settings.http_timeout)?;
                Ok(Arc::new(sink))
            }
            SinkTarget::Relational {
                db_type: DbType::Postgres,
                conn_string,
            } => {
                let sink = PostgresSink::connect(conn_string, settings.pool_size).await?;
                Ok(Arc::new(sink))
            }
        }
    }

    /// Description safe for logs (no credentials)
    pub fn describe(&self) -> String {
        match self {
            SinkTarget::Http { base_url } => base_url.clone(),
            SinkTarget::Relational { db_type, conn_string } => {
                format!("{:?} ({})", db_type, postgres::redact(conn_string))
            }
        }
    }
}

pub fn is_http_target(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}
