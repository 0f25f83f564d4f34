use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{StorageProvider, file_name, parquet, validate_time_format};
use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::record::VehicleUpdate;

/// Writes Parquet files under a base directory on the local filesystem.
///
/// Files are staged under a hidden name and renamed into place once fully
/// written, so a failed write never leaves a file with the final name.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    file_prefix: String,
    time_format: String,
}

impl LocalStorage {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        validate_time_format(&config.time_format)?;
        Ok(Self {
            base_path: PathBuf::from(&config.base_path),
            file_prefix: config.file_prefix.clone(),
            time_format: config.time_format.clone(),
        })
    }

    /// Writes `records` to the file named after `now`.
    #[tracing::instrument(skip_all, fields(base_path = %self.base_path.display(), records = records.len()))]
    pub async fn write_at(
        &self,
        records: &[VehicleUpdate],
        now: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        let name = file_name(&self.file_prefix, &self.time_format, now)?;
        let path = self.base_path.join(&name);
        let bytes = parquet::encode(records)?;

        tokio::fs::create_dir_all(&self.base_path).await?;
        if tokio::fs::try_exists(&path).await? {
            return Err(StorageError::AlreadyExists(path.display().to_string()));
        }

        let staging = self.base_path.join(format!(".{name}.partial"));
        if let Err(e) = stage_and_rename(&staging, &path, &bytes).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }

        debug!(bytes = bytes.len(), "Parquet file written");
        info!(path = %path.display(), "Vehicle updates stored locally");
        Ok(path.display().to_string())
    }
}

async fn stage_and_rename(staging: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(staging).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(staging, path).await
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn write(&self, records: &[VehicleUpdate]) -> Result<String, StorageError> {
        self.write_at(records, Utc::now()).await
    }
}
