//! HTTP sink - POSTs records as JSON to an ingest service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use super::{Sink, SinkKind};
use crate::error::{RelayError, Result};
use crate::sync::models::{Bucket, Event};

/// Sink forwarding to `<base>/buckets` and `<base>/events`
pub struct HttpSink {
    buckets_url: String,
    events_url: String,
    client: reqwest::Client,
}

impl HttpSink {
    /// Create a sink for an ingest service base URL
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = base_url.trim_end_matches('/');
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            buckets_url: format!("{}/buckets", base),
            events_url: format!("{}/events", base),
            client,
        })
    }

    pub fn buckets_url(&self) -> &str {
        &self.buckets_url
    }

    pub fn events_url(&self) -> &str {
        &self.events_url
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, record: &T) -> Result<()> {
        let response = self.client.post(url).json(record).send().await?;

        // The ingest service answers 200 on success; anything else is a
        // failure for this record.
        if response.status() != StatusCode::OK {
            return Err(RelayError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Sink for HttpSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Http
    }

    /// The ingest service owns its schema
    async fn run_migrations(&self) -> Result<usize> {
        Ok(0)
    }

    async fn insert_bucket(&self, bucket: &Bucket) -> Result<()> {
        self.post(&self.buckets_url, bucket).await
    }

    async fn insert_event(&self, event: &Event) -> Result<()> {
        self.post(&self.events_url, event).await
    }
}
