//! ActivityWatch Sync Module
//!
//! Reads buckets and events from ActivityWatch's SQLite database and
//! ships them to PostgreSQL or an HTTP ingest service.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                     Relay                        │
//! │  ┌──────────────┐   ┌──────────┐   ┌──────────┐  │
//! │  │ SourceReader │──▶│ dispatch │──▶│   Sink   │  │
//! │  │  (SQLite)    │   │ (workers)│   │ (pg/http)│  │
//! │  └──────────────┘   └──────────┘   └──────────┘  │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod models;
pub mod sink;
pub mod source;

pub use config::{RelayConfig, RunSettings, DEFAULT_CONCURRENCY, DEFAULT_RUN_TIMEOUT_SECS};
pub use controller::{LoadMode, Relay, RelayEvent, RunSummary};
pub use dispatch::{dispatch, DispatchReport};
pub use models::{Bucket, Event};
pub use sink::{DbType, HttpSink, PostgresSink, Sink, SinkKind, SinkTarget};
pub use source::{Extract, SourceReader};
