//! CLI entry point for transit_flow.
//!
//! Fetches a GTFS-RT feed, flattens it into vehicle update rows and stores
//! them as a Parquet file on local disk or S3.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use reqwest::Url;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_flow::{
    config::{
        ApiKeyConfig, Credentials, DEFAULT_BASE_PATH, DEFAULT_FILE_PREFIX, DEFAULT_TIME_FORMAT,
        FetchConfig, StorageConfig, StorageKind,
    },
    fetch::build_client,
    output::{append_cycle, log_failure, log_report},
    pipeline::Pipeline,
    storage::{StorageBackend, parquet},
};

#[derive(Parser)]
#[command(name = "transit_flow")]
#[command(about = "Store GTFS-RT vehicle updates as Parquet", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the feed and write one Parquet file per cycle
    Run {
        #[command(flatten)]
        feed: FeedArgs,

        #[command(flatten)]
        storage: StorageArgs,

        /// Repeat every N seconds instead of running a single cycle
        #[arg(long, env = "CYCLE_INTERVAL_SECS")]
        interval_secs: Option<u64>,

        /// CSV file to append cycle metrics to
        #[arg(long, env = "METRICS_FILE")]
        metrics_file: Option<String>,
    },
    /// Summarize a Parquet file written by `run`
    Inspect {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Args)]
struct FeedArgs {
    /// GTFS-RT endpoint
    #[arg(long, env = "FEED_URL")]
    feed_url: Url,

    #[arg(long, env = "FEED_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "FEED_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// API key sent in the `--api-key-header` header
    #[arg(long, env = "FEED_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "FEED_API_KEY_HEADER", default_value = "x-api-key")]
    api_key_header: String,

    /// Overall request timeout
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,
}

impl FeedArgs {
    fn into_config(self) -> FetchConfig {
        FetchConfig {
            feed_url: self.feed_url,
            credentials: Credentials::from_parts(self.username, self.password),
            api_key: self.api_key.map(|key| ApiKeyConfig {
                header_name: self.api_key_header,
                key,
            }),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Local,
    S3,
}

#[derive(Args)]
struct StorageArgs {
    #[arg(long, env = "STORAGE_BACKEND", value_enum, default_value_t = Backend::Local)]
    backend: Backend,

    /// Output directory, or key prefix inside the bucket
    #[arg(long, env = "STORAGE_BASE_PATH", default_value = DEFAULT_BASE_PATH)]
    base_path: String,

    #[arg(long, env = "S3_BUCKET")]
    bucket: Option<String>,

    /// strftime pattern for the timestamp part of file names
    #[arg(long, env = "FILENAME_TIME_FORMAT", default_value = DEFAULT_TIME_FORMAT)]
    time_format: String,
}

impl StorageArgs {
    fn into_config(self) -> StorageConfig {
        StorageConfig {
            kind: match self.backend {
                Backend::Local => StorageKind::Local,
                Backend::S3 => StorageKind::S3,
            },
            base_path: self.base_path,
            bucket: self.bucket,
            time_format: self.time_format,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/transit_flow.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_flow.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            feed,
            storage,
            interval_secs,
            metrics_file,
        } => {
            run(
                feed.into_config(),
                storage.into_config(),
                interval_secs,
                metrics_file,
            )
            .await?;
        }
        Commands::Inspect { file } => inspect(&file)?,
    }

    Ok(())
}

/// Runs one cycle, or independent cycles every `interval_secs`. The first
/// failing cycle ends the process.
#[tracing::instrument(skip_all, fields(interval_secs = ?interval_secs))]
async fn run(
    fetch_config: FetchConfig,
    storage_config: StorageConfig,
    interval_secs: Option<u64>,
    metrics_file: Option<String>,
) -> Result<()> {
    let client = build_client(&fetch_config)?;
    let storage = StorageBackend::from_config(&storage_config).await?;
    let pipeline = Pipeline::new(client, fetch_config.feed_url.clone(), storage);

    let mut cycle = 0u64;
    loop {
        cycle += 1;
        info!(cycle, "Starting cycle");

        let cancel = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        let outcome = pipeline.run_cycle_until(cancel).await;
        if let Some(path) = &metrics_file {
            append_cycle(path, &outcome)?;
        }

        let report = match outcome {
            Ok(report) => report,
            Err(failure) => {
                log_failure(&failure);
                error!(code = failure.code(), "Stopping after failed cycle");
                return Err(failure.into());
            }
        };

        info!(
            location = %report.location,
            records = report.metrics.record_count,
            "Fetched {} updates in {:?}",
            report.metrics.record_count,
            report.metrics.total_time
        );
        log_report(&report)?;

        let Some(interval) = interval_secs else {
            break;
        };
        info!(interval, "Waiting before next cycle");
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(interval)) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
        }
    }

    Ok(())
}

/// Logs row count and a per-column overview of a Parquet output file.
fn inspect(path: &Path) -> Result<()> {
    let rows = parquet::read_file(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let with_trip = rows.iter().filter(|r| !r.trip_id.is_empty()).count();
    let with_vehicle = rows.iter().filter(|r| !r.vehicle_id.is_empty()).count();
    let positioned = rows
        .iter()
        .filter(|r| r.latitude != 0.0 || r.longitude != 0.0)
        .count();
    let fetched_at = rows.first().map(|r| r.timestamp);

    info!(
        file = %path.display(),
        rows = rows.len(),
        fetched_at_ms = fetched_at,
        positioned,
        with_trip,
        with_vehicle,
        "Parquet summary"
    );

    Ok(())
}
