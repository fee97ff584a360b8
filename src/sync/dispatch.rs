//! Dispatch Engine
//!
//! Writes one extraction through a sink:
//!
//! ```text
//!   buckets ──▶ insert_bucket (one at a time, in order)
//!                      │
//!                      ▼ (all bucket calls issued)
//!   events ──▶ [bounded channel, cap = C] ──▶ worker 1..C ──▶ insert_event
//!                                                   │
//!                                        join barrier ──▶ DispatchReport
//! ```
//!
//! Every event is attempted exactly once. Order across workers is not
//! preserved. A failed record is logged and counted, never retried.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use super::models::{Bucket, Event};
use super::sink::Sink;
use crate::error::{RelayError, Result};

/// Outcome counts for one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub buckets_attempted: usize,
    pub buckets_delivered: usize,
    pub events_attempted: usize,
    pub events_delivered: usize,
}

impl DispatchReport {
    pub fn buckets_failed(&self) -> usize {
        self.buckets_attempted - self.buckets_delivered
    }

    pub fn events_failed(&self) -> usize {
        self.events_attempted - self.events_delivered
    }
}

/// Per-worker counts, summed after the barrier
#[derive(Debug, Default)]
struct WorkerTally {
    attempted: usize,
    delivered: usize,
}

/// Send `buckets` sequentially, then `events` through `concurrency`
/// workers. Returns once every worker has exited.
pub async fn dispatch(
    buckets: &[Bucket],
    events: &[Event],
    sink: Arc<dyn Sink>,
    concurrency: usize,
) -> Result<DispatchReport> {
    if concurrency == 0 {
        return Err(RelayError::InvalidConcurrency(concurrency));
    }

    let mut report = DispatchReport::default();

    for bucket in buckets {
        report.buckets_attempted += 1;
        match sink.insert_bucket(bucket).await {
            Ok(()) => report.buckets_delivered += 1,
            Err(e) => {
                tracing::warn!("Error inserting bucket {} ({}): {}", bucket.key, bucket.id, e)
            }
        }
    }

    tracing::info!(
        "Wrote {}/{} buckets",
        report.buckets_delivered,
        report.buckets_attempted
    );

    let (tx, rx) = mpsc::channel::<Event>(concurrency);
    let rx = Arc::new(Mutex::new(rx));

    // Dropping the set (e.g. on deadline) aborts every worker.
    let mut workers = JoinSet::new();
    for worker_id in 0..concurrency {
        let rx = Arc::clone(&rx);
        let sink = Arc::clone(&sink);
        workers.spawn(event_worker(worker_id, rx, sink));
    }

    for event in events {
        if tx.send(event.clone()).await.is_err() {
            // Only possible if every worker is gone
            break;
        }
    }
    drop(tx);

    while let Some(joined) = workers.join_next().await {
        let tally = joined?;
        report.events_attempted += tally.attempted;
        report.events_delivered += tally.delivered;
    }

    if report.events_attempted != events.len() {
        return Err(RelayError::Worker(format!(
            "{} of {} events were never attempted",
            events.len() - report.events_attempted,
            events.len()
        )));
    }

    tracing::info!(
        "Wrote {}/{} events with {} workers",
        report.events_delivered,
        report.events_attempted,
        concurrency
    );

    Ok(report)
}

async fn event_worker(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<Event>>>,
    sink: Arc<dyn Sink>,
) -> WorkerTally {
    let mut tally = WorkerTally::default();

    loop {
        // Hold the lock only while waiting for the next event
        let next = rx.lock().await.recv().await;
        let Some(event) = next else { break };

        tally.attempted += 1;
        match sink.insert_event(&event).await {
            Ok(()) => tally.delivered += 1,
            Err(e) => {
                tracing::warn!("Error inserting event {} (worker {}): {}", event.id, worker_id, e)
            }
        }
    }

    tally
}
