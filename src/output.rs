//! Cycle reporting: log lines and an append-only CSV ledger with one row per
//! cycle, successful or not.

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::pipeline::{CycleFailure, CycleMetrics, CycleReport, duration_ms};

/// Ledger row. `location` is empty and `outcome` holds the error code for a failed cycle.
#[derive(Debug, Serialize)]
struct LedgerRow<'a> {
    timestamp: DateTime<Utc>,
    outcome: &'a str,
    location: &'a str,
    fetch_ms: f64,
    processing_ms: f64,
    write_ms: f64,
    total_ms: f64,
    entity_count: usize,
    record_count: usize,
}

impl<'a> LedgerRow<'a> {
    fn new(outcome: &'a str, location: &'a str, metrics: &CycleMetrics) -> Self {
        Self {
            timestamp: metrics.timestamp,
            outcome,
            location,
            fetch_ms: duration_ms(metrics.fetch_time),
            processing_ms: duration_ms(metrics.processing_time),
            write_ms: duration_ms(metrics.write_time),
            total_ms: duration_ms(metrics.total_time),
            entity_count: metrics.entity_count,
            record_count: metrics.record_count,
        }
    }
}

/// Logs a finished cycle: the debug dump at `debug`, the JSON report at `info`.
pub fn log_report(report: &CycleReport) -> Result<()> {
    debug!("{:#?}", report);
    info!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Logs a failed cycle with the timings collected before the failing stage.
pub fn log_failure(failure: &CycleFailure) {
    warn!(
        code = failure.code(),
        error = %failure.error,
        fetch_ms = duration_ms(failure.metrics.fetch_time),
        write_ms = duration_ms(failure.metrics.write_time),
        total_ms = duration_ms(failure.metrics.total_time),
        records = failure.metrics.record_count,
        "Cycle failed"
    );
}

/// Appends one ledger row for a cycle outcome, writing the header when the
/// file is new. Parent directories are created as needed.
pub fn append_cycle(
    path: impl AsRef<Path>,
    outcome: &Result<CycleReport, CycleFailure>,
) -> Result<()> {
    let path = path.as_ref();
    let row = match outcome {
        Ok(report) => LedgerRow::new("ok", &report.location, &report.metrics),
        Err(failure) => LedgerRow::new(failure.code(), "", &failure.metrics),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, outcome = row.outcome, "Appending ledger row");

    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    writer.serialize(&row)?;
    writer.flush()?;

    Ok(())
}
