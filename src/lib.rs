//! Activity Relay - ship ActivityWatch data to a durable sink
//!
//! Provides full and windowed loads from the local SQLite store into
//! PostgreSQL or an HTTP ingest service.

pub mod error;
#[cfg(feature = "ingest-server")]
pub mod server;
pub mod sync;

// Re-export commonly used types
pub use error::{RelayError, Result};
pub use sync::{
    Bucket, DispatchReport, Event, LoadMode, Relay, RelayConfig, RelayEvent, RunSettings,
    RunSummary, Sink, SinkKind, SinkTarget,
};
