//! Persistence of vehicle update batches as ZSTD-compressed Parquet files.
//!
//! [`StorageProvider`] is the single write contract; [`StorageBackend`] picks
//! the local or S3 implementation once, from configuration.

mod local;
pub mod parquet;
mod s3;

pub use local::LocalStorage;
pub use s3::{ObjectClient, S3Storage};

use std::fmt::Write;

use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};

use crate::config::{StorageConfig, StorageKind};
use crate::error::StorageError;
use crate::record::VehicleUpdate;

/// Writes a complete batch and returns where it was stored.
///
/// A returned location always refers to a finished file; any failure means
/// nothing usable was written.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    async fn write(&self, records: &[VehicleUpdate]) -> Result<String, StorageError>;
}

fn render_time(time_format: &str, now: DateTime<Utc>) -> Result<String, StorageError> {
    let invalid = || StorageError::InvalidTimeFormat(time_format.to_string());
    let items = StrftimeItems::new(time_format);
    if items.clone().any(|item| matches!(item, Item::Error)) {
        return Err(invalid());
    }

    // Parse-only specifiers such as `%#z` only fail when rendered.
    let mut rendered = String::new();
    write!(rendered, "{}", now.format_with_items(items)).map_err(|_| invalid())?;
    Ok(rendered)
}

pub(crate) fn validate_time_format(time_format: &str) -> Result<(), StorageError> {
    render_time(time_format, DateTime::<Utc>::UNIX_EPOCH).map(drop)
}

/// `{prefix}_{now formatted}.parquet`.
///
/// Names are unique only down to the resolution of `time_format`.
pub fn file_name(
    prefix: &str,
    time_format: &str,
    now: DateTime<Utc>,
) -> Result<String, StorageError> {
    let time = render_time(time_format, now)?;
    Ok(format!("{prefix}_{time}.{}", parquet::EXTENSION))
}

/// The storage implementation selected at startup.
pub enum StorageBackend {
    Local(LocalStorage),
    S3(S3Storage),
}

impl StorageBackend {
    /// Builds the configured backend. S3 uses the ambient AWS configuration.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        match config.kind {
            StorageKind::Local => Ok(Self::Local(LocalStorage::new(config)?)),
            StorageKind::S3 => {
                let sdk_config = aws_config::load_from_env().await;
                let client = aws_sdk_s3::Client::new(&sdk_config);
                Ok(Self::S3(S3Storage::new(client, config)?))
            }
        }
    }
}

#[async_trait]
impl StorageProvider for StorageBackend {
    async fn write(&self, records: &[VehicleUpdate]) -> Result<String, StorageError> {
        match self {
            Self::Local(storage) => storage.write(records).await,
            Self::S3(storage) => storage.write(records).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_name_uses_format_and_prefix() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            file_name("gtfs", "%Y-%m-%d_%H-%M-%S", now).unwrap(),
            "gtfs_2024-03-09_14-05-07.parquet"
        );
        assert_eq!(
            file_name("vp", crate::config::DEFAULT_TIME_FORMAT, now).unwrap(),
            "vp_2024-03-09_14-05-07-000.parquet"
        );
    }

    #[test]
    fn test_file_name_rejects_bad_format() {
        let now = Utc::now();
        assert!(matches!(
            file_name("gtfs", "%Y-%", now),
            Err(StorageError::InvalidTimeFormat(_))
        ));
    }

    #[test]
    fn test_parse_only_format_is_rejected_up_front() {
        assert!(matches!(
            file_name("gtfs", "%#z", Utc::now()),
            Err(StorageError::InvalidTimeFormat(_))
        ));

        let config = StorageConfig::local("output").with_time_format("%#z");
        assert!(matches!(
            LocalStorage::new(&config),
            Err(StorageError::InvalidTimeFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_local_backend_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::local(dir.path().display().to_string());
        let backend = StorageBackend::from_config(&config).await.unwrap();
        assert!(matches!(backend, StorageBackend::Local(_)));

        let location = backend.write(&[]).await.unwrap();
        assert!(location.ends_with(".parquet"));
        assert!(parquet::read_file(&location).unwrap().is_empty());
    }
}
