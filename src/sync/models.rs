//! Data Models for ActivityWatch Sync
//!
//! These structures represent the rows extracted from ActivityWatch's
//! SQLite store and shipped to the remote sink. Field names on the wire
//! match what the ingest service decodes.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Textual layout of `bucketmodel.created` (naive, implicitly UTC)
pub const BUCKET_CREATED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Textual layout of `eventmodel.timestamp` (carries a UTC offset)
pub const EVENT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%:z";

/// A bucket: a named container of events from one watcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Source-local surrogate key, conflict key at the sink
    #[serde(rename = "Key")]
    pub key: i64,

    /// Stable external identifier (e.g. `aw-watcher-window_myhost`)
    #[serde(rename = "ID")]
    pub id: String,

    /// Creation time
    #[serde(rename = "Created")]
    pub created: DateTime<Utc>,

    #[serde(rename = "Name")]
    pub name: String,

    /// Bucket type (e.g. `currentwindow`, `afkstatus`)
    #[serde(rename = "Type")]
    pub kind: String,

    #[serde(rename = "Client")]
    pub client: String,

    #[serde(rename = "Hostname")]
    pub hostname: String,
}

/// A single timestamped activity record inside a bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Source-local surrogate key, conflict key at the sink
    #[serde(rename = "ID")]
    pub id: i64,

    /// `key` of the owning bucket
    #[serde(rename = "BucketID")]
    pub bucket_id: i64,

    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,

    /// Duration in seconds
    #[serde(rename = "Duration")]
    pub duration: f64,

    /// Opaque payload, usually serialized JSON
    #[serde(rename = "DataStr")]
    pub data_str: String,
}

/// Parse a `bucketmodel.created` value
pub fn parse_bucket_created(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, BUCKET_CREATED_FORMAT).map(|naive| naive.and_utc())
}

/// Parse an `eventmodel.timestamp` value, normalized to UTC
pub fn parse_event_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::<FixedOffset>::parse_from_str(value, EVENT_TIMESTAMP_FORMAT)
        .map(|ts| ts.with_timezone(&Utc))
}

/// Render a cutoff in the bucket layout, for text comparison in SQLite
pub fn format_bucket_cutoff(cutoff: DateTime<Utc>) -> String {
    format!("{}{}", cutoff.format("%Y-%m-%dT%H:%M:%S"), trimmed_fraction(cutoff))
}

/// Render a cutoff in the event layout, for text comparison in SQLite
pub fn format_event_cutoff(cutoff: DateTime<Utc>) -> String {
    format!(
        "{}{}{}",
        cutoff.format("%Y-%m-%d %H:%M:%S"),
        trimmed_fraction(cutoff),
        cutoff.format("%:z")
    )
}

/// Microsecond fraction with trailing zeros dropped, empty when zero.
///
/// A stored value without a fraction must not sort below an equal cutoff,
/// so the cutoff never carries more digits than it needs.
fn trimmed_fraction(cutoff: DateTime<Utc>) -> String {
    let micros = cutoff.timestamp_subsec_micros().min(999_999);
    if micros == 0 {
        return String::new();
    }
    format!(".{:06}", micros).trim_end_matches('0').to_string()
}

impl Bucket {
    /// Create a bucket with empty descriptive metadata
    pub fn new(key: i64, id: impl Into<String>, created: DateTime<Utc>) -> Self {
        Self {
            key,
            id: id.into(),
            created,
            name: String::new(),
            kind: String::new(),
            client: String::new(),
            hostname: String::new(),
        }
    }
}

impl Event {
    /// Create an event with zero duration and an empty payload
    pub fn new(id: i64, bucket_id: i64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            bucket_id,
            timestamp,
            duration: 0.0,
            data_str: String::new(),
        }
    }
}
