//! Relay Controller
//!
//! Runs one invocation: classify the target, connect the sink, run
//! migrations (full load only), extract from the source and dispatch.
//! Everything after classification happens under one deadline.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::config::RunSettings;
use super::dispatch::{dispatch, DispatchReport};
use super::sink::{Sink, SinkKind, SinkTarget};
use super::source::SourceReader;
use crate::error::{RelayError, Result};

/// Which records a run forwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Everything in the source ("init")
    Full,
    /// Records at or after `now - interval_secs` ("sync")
    Windowed { interval_secs: u64 },
}

impl LoadMode {
    /// Lower bound for a run starting at `now`
    pub fn window_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            LoadMode::Full => None,
            LoadMode::Windowed { interval_secs } => {
                let secs = i64::try_from(*interval_secs).unwrap_or(i64::MAX);
                let cutoff = chrono::Duration::try_seconds(secs)
                    .and_then(|d| now.checked_sub_signed(d))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC);
                Some(cutoff)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LoadMode::Full => "init",
            LoadMode::Windowed { .. } => "sync",
        }
    }
}

/// Progress notifications
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// Run started
    Started { mode: LoadMode, target: String },
    /// Schema migrations finished
    Migrated { applied: usize },
    /// Source read finished
    Extracted { buckets: usize, events: usize },
    /// All records attempted
    Dispatched(DispatchReport),
    /// Run aborted
    Failed { error: String },
}

/// Result of one run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub mode: LoadMode,
    pub window_start: Option<DateTime<Utc>>,
    pub report: DispatchReport,
    pub duration: Duration,
}

/// Extract-and-dispatch runner
pub struct Relay {
    settings: RunSettings,

    event_callback: Option<Box<dyn Fn(RelayEvent) + Send + Sync>>,
}

impl Relay {
    /// Create a relay with default settings
    pub fn new() -> Self {
        Self::with_settings(RunSettings::default())
    }

    pub fn with_settings(settings: RunSettings) -> Self {
        Self {
            settings,
            event_callback: None,
        }
    }

    /// Set event callback
    pub fn on_event<F>(&mut self, callback: F)
    where
        F: Fn(RelayEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(Box::new(callback));
    }

    /// Full load of every bucket and event
    pub async fn initialize(
        &self,
        db_type: &str,
        source_path: impl AsRef<Path>,
        target: &str,
        concurrency: usize,
    ) -> Result<RunSummary> {
        self.run(LoadMode::Full, db_type, source_path.as_ref(), target, concurrency)
            .await
    }

    /// Windowed load of records from the last `interval_secs` seconds
    pub async fn sync(
        &self,
        db_type: &str,
        source_path: impl AsRef<Path>,
        target: &str,
        interval_secs: u64,
        concurrency: usize,
    ) -> Result<RunSummary> {
        self.run(
            LoadMode::Windowed { interval_secs },
            db_type,
            source_path.as_ref(),
            target,
            concurrency,
        )
        .await
    }

    async fn run(
        &self,
        mode: LoadMode,
        db_type: &str,
        source_path: &Path,
        target: &str,
        concurrency: usize,
    ) -> Result<RunSummary> {
        let target = match SinkTarget::classify(db_type, target) {
            Ok(target) => target,
            Err(e) => return self.finish(Err(e)),
        };
        self.emit_event(RelayEvent::Started {
            mode,
            target: target.describe(),
        });

        let result = self
            .with_deadline(async {
                let reader = SourceReader::new(source_path)?;
                let sink = target.connect(&self.settings).await?;
                self.pipeline(mode, reader, sink, concurrency).await
            })
            .await;

        self.finish(result)
    }

    /// Run against a sink the caller already built
    pub async fn run_with_sink(
        &self,
        mode: LoadMode,
        source_path: impl Into<PathBuf>,
        sink: Arc<dyn Sink>,
        concurrency: usize,
    ) -> Result<RunSummary> {
        let source_path = source_path.into();
        self.emit_event(RelayEvent::Started {
            mode,
            target: format!("{:?} sink", sink.kind()),
        });

        let result = self
            .with_deadline(async {
                let reader = SourceReader::new(&source_path)?;
                self.pipeline(mode, reader, sink, concurrency).await
            })
            .await;

        self.finish(result)
    }

    async fn pipeline(
        &self,
        mode: LoadMode,
        reader: SourceReader,
        sink: Arc<dyn Sink>,
        concurrency: usize,
    ) -> Result<RunSummary> {
        if concurrency == 0 {
            return Err(RelayError::InvalidConcurrency(concurrency));
        }

        let start = Instant::now();
        let window_start = mode.window_start(Utc::now());

        if mode == LoadMode::Full && sink.kind() == SinkKind::Relational {
            let applied = sink.run_migrations().await?;
            self.emit_event(RelayEvent::Migrated { applied });
        }

        let extract = tokio::task::spawn_blocking(move || reader.extract(window_start)).await??;
        self.emit_event(RelayEvent::Extracted {
            buckets: extract.buckets.len(),
            events: extract.events.len(),
        });

        let report = dispatch(&extract.buckets, &extract.events, sink, concurrency).await?;
        self.emit_event(RelayEvent::Dispatched(report));

        tracing::info!(
            "Successfully {} {} buckets and {} events to the remote sink",
            if mode == LoadMode::Full { "loaded" } else { "synced" },
            report.buckets_attempted,
            report.events_attempted
        );

        Ok(RunSummary {
            mode,
            window_start,
            report,
            duration: start.elapsed(),
        })
    }

    async fn with_deadline<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.settings.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(RelayError::Timeout(self.settings.timeout)),
        }
    }

    fn finish(&self, result: Result<RunSummary>) -> Result<RunSummary> {
        if let Err(ref e) = result {
            tracing::error!("Run failed: {}", e);
            self.emit_event(RelayEvent::Failed {
                error: e.to_string(),
            });
        }
        result
    }

    /// Emit an event
    fn emit_event(&self, event: RelayEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(event);
        }
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}
