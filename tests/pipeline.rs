//! End-to-end runs of the relay against an in-memory sink

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use activity_relay::sync::{LoadMode, Relay, RunSettings};
use activity_relay::RelayError;
use chrono::Utc;

use common::{MemorySink, SourceFixture};

fn relay() -> Relay {
    Relay::with_settings(RunSettings {
        timeout: Duration::from_secs(10),
        ..RunSettings::default()
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_example_scenario_and_rerun() {
    let source = SourceFixture::example();
    let sink = Arc::new(MemorySink::relational());
    let relay = relay();

    let first = relay
        .run_with_sink(LoadMode::Full, &source.path, sink.clone(), 2)
        .await
        .unwrap();
    assert_eq!(first.report.buckets_delivered, 2);
    assert_eq!(first.report.events_delivered, 3);
    assert_eq!(sink.new_rows.load(Ordering::SeqCst), 5);
    assert_eq!(sink.bucket_keys(), vec![1, 2]);
    assert_eq!(sink.event_ids(), vec![1, 2, 3]);

    let second = relay
        .run_with_sink(LoadMode::Full, &source.path, sink.clone(), 2)
        .await
        .unwrap();
    assert_eq!(second.report.buckets_attempted, 2);
    assert_eq!(second.report.events_attempted, 3);
    // Nothing new landed on the second pass
    assert_eq!(sink.new_rows.load(Ordering::SeqCst), 5);
    assert_eq!(sink.row_counts(), (2, 3));
}

#[tokio::test]
async fn test_full_load_runs_migrations_once_per_run() {
    let source = SourceFixture::example();
    let sink = Arc::new(MemorySink::relational());
    let relay = relay();

    relay
        .run_with_sink(LoadMode::Full, &source.path, sink.clone(), 1)
        .await
        .unwrap();
    assert_eq!(sink.migrations_run.load(Ordering::SeqCst), 1);

    relay
        .run_with_sink(LoadMode::Windowed { interval_secs: 60 }, &source.path, sink.clone(), 1)
        .await
        .unwrap();
    assert_eq!(sink.migrations_run.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_windowed_load_delivers_only_recent_records() {
    let interval_secs = 3600;
    let cutoff = Utc::now() - chrono::Duration::seconds(interval_secs as i64);

    let source = SourceFixture::new();
    source
        .bucket(1, "before-10", cutoff - chrono::Duration::seconds(10))
        .bucket(2, "before-5", cutoff - chrono::Duration::seconds(5))
        .bucket(3, "after-5", cutoff + chrono::Duration::seconds(5))
        .event(1, 1, cutoff - chrono::Duration::seconds(10))
        .event(2, 2, cutoff - chrono::Duration::seconds(5))
        .event(3, 3, cutoff + chrono::Duration::seconds(5));

    let sink = Arc::new(MemorySink::relational());
    let summary = relay()
        .run_with_sink(LoadMode::Windowed { interval_secs }, &source.path, sink.clone(), 4)
        .await
        .unwrap();

    assert!(summary.window_start.is_some());
    assert_eq!(sink.bucket_keys(), vec![3]);
    assert_eq!(sink.event_ids(), vec![3]);
    assert_eq!(summary.report.events_attempted, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rejected_event_is_isolated() {
    let now = Utc::now();
    let source = SourceFixture::new();
    source.bucket(1, "b1", now);
    for id in 1..=40 {
        source.event(id, 1, now);
    }

    let sink = Arc::new(MemorySink::relational().rejecting(&[7, 23]));
    let summary = relay()
        .run_with_sink(LoadMode::Full, &source.path, sink.clone(), 8)
        .await
        .unwrap();

    assert_eq!(summary.report.events_attempted, 40);
    assert_eq!(summary.report.events_delivered, 38);
    assert_eq!(summary.report.events_failed(), 2);
    assert!(!sink.event_ids().contains(&7));
    assert_eq!(sink.row_counts(), (1, 38));
}

#[tokio::test]
async fn test_rejected_bucket_is_isolated() {
    let now = Utc::now();
    let source = SourceFixture::new();
    source
        .bucket(1, "b1", now)
        .bucket(2, "b2", now)
        .bucket(3, "b3", now)
        .event(1, 1, now)
        .event(2, 3, now);

    let sink = Arc::new(MemorySink::relational().rejecting_buckets(&[2]));
    let summary = relay()
        .run_with_sink(LoadMode::Full, &source.path, sink.clone(), 2)
        .await
        .unwrap();

    assert_eq!(summary.report.buckets_attempted, 3);
    assert_eq!(summary.report.buckets_failed(), 1);
    assert_eq!(summary.report.events_delivered, 2);
    assert_eq!(sink.bucket_keys(), vec![1, 3]);
    assert_eq!(sink.event_ids(), vec![1, 2]);
}

#[tokio::test]
async fn test_malformed_timestamp_aborts_before_any_write() {
    let now = Utc::now();
    let source = SourceFixture::new();
    source
        .bucket(1, "b1", now)
        .bucket_raw(2, "b2", "01/03/2024 09:00")
        .event(1, 1, now);

    let sink = Arc::new(MemorySink::relational());
    let err = relay()
        .run_with_sink(LoadMode::Full, &source.path, sink.clone(), 2)
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::Timestamp { table: "bucketmodel", row: 2, .. }));
    assert_eq!(sink.row_counts(), (0, 0));
}

#[tokio::test]
async fn test_deadline_aborts_run() {
    let now = Utc::now();
    let source = SourceFixture::new();
    source.bucket(1, "b1", now);
    for id in 1..=10 {
        source.event(id, 1, now);
    }

    let sink = Arc::new(MemorySink::relational().slow(Duration::from_millis(500)));
    let relay = Relay::with_settings(RunSettings {
        timeout: Duration::from_millis(200),
        ..RunSettings::default()
    });

    let err = relay
        .run_with_sink(LoadMode::Full, &source.path, sink, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Timeout(d) if d == Duration::from_millis(200)));
}

#[tokio::test]
async fn test_zero_concurrency_is_rejected_up_front() {
    let source = SourceFixture::example();
    let sink = Arc::new(MemorySink::relational());
    let err = relay()
        .run_with_sink(LoadMode::Full, &source.path, sink.clone(), 0)
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::InvalidConcurrency(0)));
    assert_eq!(sink.migrations_run.load(Ordering::SeqCst), 0);
}
