//! One fetch → normalize → persist cycle.
//!
//! Stages run strictly in sequence and share nothing between cycles beyond the
//! client, feed URL and storage chosen at startup.

use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::info;

use crate::error::PipelineError;
use crate::fetch::{HttpClient, fetch_feed_cancellable};
use crate::normalize::normalize_feed;
use crate::storage::StorageProvider;

/// Fractional milliseconds, microsecond precision.
pub fn duration_ms(duration: Duration) -> f64 {
    duration.as_micros() as f64 / 1000.0
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration_ms(*duration))
}

/// Timings and counts for one cycle. Durations serialize as milliseconds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleMetrics {
    /// Fetch time stamped into every record, or the cycle start if the fetch failed.
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "fetch_ms", serialize_with = "as_millis")]
    pub fetch_time: Duration,
    #[serde(rename = "processing_ms", serialize_with = "as_millis")]
    pub processing_time: Duration,
    #[serde(rename = "write_ms", serialize_with = "as_millis")]
    pub write_time: Duration,
    #[serde(rename = "total_ms", serialize_with = "as_millis")]
    pub total_time: Duration,
    pub entity_count: usize,
    pub record_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// Path or URI of the written file.
    pub location: String,
    pub metrics: CycleMetrics,
}

/// A cycle that stopped at a failing stage, with the timings gathered up to it.
///
/// Stages after the failing one keep zero durations and counts.
#[derive(Debug, Error)]
#[error("cycle failed after {elapsed:?}", elapsed = .metrics.total_time)]
pub struct CycleFailure {
    #[source]
    pub error: PipelineError,
    pub metrics: CycleMetrics,
}

impl CycleFailure {
    fn new(error: impl Into<PipelineError>, metrics: &CycleMetrics, start: Instant) -> Self {
        let mut metrics = metrics.clone();
        metrics.total_time = start.elapsed();
        Self {
            error: error.into(),
            metrics,
        }
    }

    pub fn code(&self) -> &'static str {
        self.error.code()
    }
}

pub struct Pipeline<C, S> {
    client: C,
    feed_url: Url,
    storage: S,
}

impl<C: HttpClient, S: StorageProvider> Pipeline<C, S> {
    pub fn new(client: C, feed_url: Url, storage: S) -> Self {
        Self {
            client,
            feed_url,
            storage,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub async fn run_cycle(&self) -> Result<CycleReport, CycleFailure> {
        self.run_cycle_until(std::future::pending()).await
    }

    /// Runs a cycle, aborting before normalization if `cancel` completes
    /// while the feed is still being fetched.
    ///
    /// Any stage error ends the cycle; nothing is written after a failed fetch.
    #[tracing::instrument(skip_all, fields(url = %self.feed_url))]
    pub async fn run_cycle_until<F>(&self, cancel: F) -> Result<CycleReport, CycleFailure>
    where
        F: Future<Output = ()>,
    {
        let total_start = Instant::now();
        let mut metrics = CycleMetrics {
            timestamp: Utc::now(),
            ..Default::default()
        };

        let fetched = fetch_feed_cancellable(&self.client, &self.feed_url, cancel).await;
        metrics.fetch_time = total_start.elapsed();
        let feed = fetched.map_err(|e| CycleFailure::new(e, &metrics, total_start))?;

        let processing_start = Instant::now();
        let fetched_at = Utc::now();
        let records = normalize_feed(&feed, fetched_at);
        metrics.timestamp = fetched_at;
        metrics.processing_time = processing_start.elapsed();
        metrics.entity_count = feed.entity.len();
        metrics.record_count = records.len();

        let write_start = Instant::now();
        let written = self.storage.write(&records).await;
        metrics.write_time = write_start.elapsed();
        let location = written.map_err(|e| CycleFailure::new(e, &metrics, total_start))?;

        metrics.total_time = total_start.elapsed();

        info!(
            location = %location,
            entities = metrics.entity_count,
            records = metrics.record_count,
            fetch_ms = metrics.fetch_time.as_millis() as u64,
            total_ms = metrics.total_time.as_millis() as u64,
            "Cycle complete"
        );

        Ok(CycleReport { location, metrics })
    }
}
