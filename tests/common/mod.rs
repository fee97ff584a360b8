//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use activity_relay::sync::models::{format_bucket_cutoff, format_event_cutoff};
use activity_relay::sync::{Bucket, Event, Sink, SinkKind};
use activity_relay::{RelayError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

/// In-memory sink with the relational sink's conflict semantics:
/// a second insert of the same key is a silent no-op.
pub struct MemorySink {
    kind: SinkKind,
    pub buckets: Mutex<BTreeMap<i64, Bucket>>,
    pub events: Mutex<BTreeMap<i64, Event>>,
    pub reject_buckets: HashSet<i64>,
    pub reject_events: HashSet<i64>,
    pub event_delay: Option<Duration>,
    pub new_rows: AtomicUsize,
    pub migrations_run: AtomicUsize,
}

impl MemorySink {
    pub fn new(kind: SinkKind) -> Self {
        Self {
            kind,
            buckets: Mutex::new(BTreeMap::new()),
            events: Mutex::new(BTreeMap::new()),
            reject_buckets: HashSet::new(),
            reject_events: HashSet::new(),
            event_delay: None,
            new_rows: AtomicUsize::new(0),
            migrations_run: AtomicUsize::new(0),
        }
    }

    pub fn relational() -> Self {
        Self::new(SinkKind::Relational)
    }

    pub fn rejecting(mut self, ids: &[i64]) -> Self {
        self.reject_events = ids.iter().copied().collect();
        self
    }

    pub fn rejecting_buckets(mut self, keys: &[i64]) -> Self {
        self.reject_buckets = keys.iter().copied().collect();
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.event_delay = Some(delay);
        self
    }

    pub fn bucket_keys(&self) -> Vec<i64> {
        self.buckets.lock().unwrap().keys().copied().collect()
    }

    pub fn event_ids(&self) -> Vec<i64> {
        self.events.lock().unwrap().keys().copied().collect()
    }

    pub fn row_counts(&self) -> (usize, usize) {
        (
            self.buckets.lock().unwrap().len(),
            self.events.lock().unwrap().len(),
        )
    }
}

#[async_trait]
impl Sink for MemorySink {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    async fn run_migrations(&self) -> Result<usize> {
        self.migrations_run.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }

    async fn insert_bucket(&self, bucket: &Bucket) -> Result<()> {
        if self.reject_buckets.contains(&bucket.key) {
            return Err(RelayError::Worker(format!("bucket {} rejected", bucket.key)));
        }

        let mut buckets = self.buckets.lock().unwrap();
        if !buckets.contains_key(&bucket.key) {
            buckets.insert(bucket.key, bucket.clone());
            self.new_rows.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn insert_event(&self, event: &Event) -> Result<()> {
        if let Some(delay) = self.event_delay {
            tokio::time::sleep(delay).await;
        }
        if self.reject_events.contains(&event.id) {
            return Err(RelayError::Worker(format!("event {} rejected", event.id)));
        }

        let mut events = self.events.lock().unwrap();
        if !events.contains_key(&event.id) {
            events.insert(event.id, event.clone());
            self.new_rows.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// An ActivityWatch-shaped SQLite file in a temp dir
pub struct SourceFixture {
    _dir: tempfile::TempDir,
    pub path: PathBuf,
}

impl SourceFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sqlite.db");
        let conn = Connection::open(&path).expect("open fixture db");
        conn.execute_batch(
            "CREATE TABLE bucketmodel (
                key INTEGER PRIMARY KEY,
                id TEXT NOT NULL,
                created TEXT NOT NULL,
                name TEXT,
                type TEXT,
                client TEXT,
                hostname TEXT,
                datastr TEXT
            );
            CREATE TABLE eventmodel (
                id INTEGER PRIMARY KEY,
                bucket_id INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                duration REAL NOT NULL,
                datastr TEXT NOT NULL
            );",
        )
        .expect("create schema");
        Self { _dir: dir, path }
    }

    fn conn(&self) -> Connection {
        Connection::open(&self.path).expect("open fixture db")
    }

    pub fn bucket(&self, key: i64, id: &str, created: DateTime<Utc>) -> &Self {
        self.bucket_raw(key, id, &format_bucket_cutoff(created))
    }

    pub fn bucket_raw(&self, key: i64, id: &str, created: &str) -> &Self {
        self.conn()
            .execute(
                "INSERT INTO bucketmodel VALUES (?1, ?2, ?3, ?4, 'currentwindow', 'aw-watcher-window', 'testhost', '{}')",
                params![key, id, created, format!("{id} bucket")],
            )
            .expect("insert bucket");
        self
    }

    pub fn event(&self, id: i64, bucket_id: i64, timestamp: DateTime<Utc>) -> &Self {
        self.event_raw(id, bucket_id, &format_event_cutoff(timestamp))
    }

    pub fn event_raw(&self, id: i64, bucket_id: i64, timestamp: &str) -> &Self {
        self.conn()
            .execute(
                "INSERT INTO eventmodel VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, bucket_id, timestamp, 1.5, format!(r#"{{"app":"app-{id}"}}"#)],
            )
            .expect("insert event");
        self
    }

    /// The worked example: two buckets, three events
    pub fn example() -> Self {
        let now = Utc::now();
        let fixture = Self::new();
        fixture
            .bucket(1, "b1", now)
            .bucket(2, "b2", now)
            .event(1, 1, now)
            .event(2, 1, now)
            .event(3, 2, now);
        fixture
    }
}
