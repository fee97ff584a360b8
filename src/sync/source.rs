//! ActivityWatch Database Reader
//!
//! Reads buckets and events from ActivityWatch's SQLite store
//! (`bucketmodel` and `eventmodel`), optionally restricted to rows at or
//! after a cutoff.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, Row};

use super::models::{
    format_bucket_cutoff, format_event_cutoff, parse_bucket_created, parse_event_timestamp,
    Bucket, Event,
};
use crate::error::{RelayError, Result};

/// Everything pulled from the source in one run
#[derive(Debug, Clone, Default)]
pub struct Extract {
    pub buckets: Vec<Bucket>,
    pub events: Vec<Event>,
}

/// Reader for the ActivityWatch database
pub struct SourceReader {
    db_path: PathBuf,
}

/// Row as stored, before timestamp parsing
struct RawBucket {
    key: i64,
    id: String,
    created: String,
    name: Option<String>,
    kind: Option<String>,
    client: Option<String>,
    hostname: Option<String>,
}

struct RawEvent {
    id: i64,
    bucket_id: i64,
    timestamp: String,
    duration: f64,
    data_str: Option<String>,
}

impl SourceReader {
    /// Create a reader for a database file
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if !db_path.exists() {
            return Err(RelayError::SourceNotFound(db_path.display().to_string()));
        }
        Ok(Self { db_path })
    }

    /// Open a read-only connection to the database
    fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch("PRAGMA query_only = ON;")?;

        Ok(conn)
    }

    /// Read buckets and events. `None` reads everything; `Some(cutoff)`
    /// keeps rows created or timestamped at or after the cutoff.
    ///
    /// A single unparseable timestamp aborts the whole extraction.
    pub fn extract(&self, window_start: Option<DateTime<Utc>>) -> Result<Extract> {
        let conn = self.open_connection()?;

        let buckets = read_buckets(&conn, window_start)?;
        let events = read_events(&conn, window_start)?;

        tracing::info!(
            "Read {} buckets and {} events from {}{}",
            buckets.len(),
            events.len(),
            self.db_path.display(),
            window_start
                .map(|c| format!(" (since {})", c.to_rfc3339()))
                .unwrap_or_default()
        );

        Ok(Extract { buckets, events })
    }
}

fn read_buckets(conn: &Connection, window_start: Option<DateTime<Utc>>) -> Result<Vec<Bucket>> {
    let raw = match window_start {
        Some(cutoff) => {
            let bound = format_bucket_cutoff(cutoff);
            tracing::debug!("bucketmodel cutoff: created >= {}", bound);
            let mut stmt = conn.prepare("SELECT * FROM bucketmodel WHERE created >= ?1")?;
            let rows = stmt.query_map([bound], raw_bucket)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
        None => {
            let mut stmt = conn.prepare("SELECT * FROM bucketmodel")?;
            let rows = stmt.query_map([], raw_bucket)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
    };

    raw.into_iter()
        .map(|row| {
            let created =
                parse_bucket_created(&row.created).map_err(|source| RelayError::Timestamp {
                    table: "bucketmodel",
                    row: row.key,
                    value: row.created.clone(),
                    source,
                })?;
            Ok(Bucket {
                key: row.key,
                id: row.id,
                created,
                name: row.name.unwrap_or_default(),
                kind: row.kind.unwrap_or_default(),
                client: row.client.unwrap_or_default(),
                hostname: row.hostname.unwrap_or_default(),
            })
        })
        .collect()
}

fn read_events(conn: &Connection, window_start: Option<DateTime<Utc>>) -> Result<Vec<Event>> {
    let raw = match window_start {
        Some(cutoff) => {
            let bound = format_event_cutoff(cutoff);
            tracing::debug!("eventmodel cutoff: timestamp >= {}", bound);
            let mut stmt = conn.prepare("SELECT * FROM eventmodel WHERE timestamp >= ?1")?;
            let rows = stmt.query_map([bound], raw_event)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
        None => {
            let mut stmt = conn.prepare("SELECT * FROM eventmodel")?;
            let rows = stmt.query_map([], raw_event)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
    };

    raw.into_iter()
        .map(|row| {
            let timestamp =
                parse_event_timestamp(&row.timestamp).map_err(|source| RelayError::Timestamp {
                    table: "eventmodel",
                    row: row.id,
                    value: row.timestamp.clone(),
                    source,
                })?;
            Ok(Event {
                id: row.id,
                bucket_id: row.bucket_id,
                timestamp,
                duration: row.duration,
                data_str: row.data_str.unwrap_or_default(),
            })
        })
        .collect()
}

// Column ordinals follow the ActivityWatch peewee schema.
fn raw_bucket(row: &Row<'_>) -> rusqlite::Result<RawBucket> {
    Ok(RawBucket {
        key: row.get(0)?,
        id: row.get(1)?,
        created: row.get(2)?,
        name: row.get(3)?,
        kind: row.get(4)?,
        client: row.get(5)?,
        hostname: row.get(6)?,
    })
}

fn raw_event(row: &Row<'_>) -> rusqlite::Result<RawEvent> {
    Ok(RawEvent {
        id: row.get(0)?,
        bucket_id: row.get(1)?,
        timestamp: row.get(2)?,
        duration: row.get(3)?,
        data_str: row.get(4)?,
    })
}
