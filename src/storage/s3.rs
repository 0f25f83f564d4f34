use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::info;

use super::{StorageProvider, file_name, parquet, validate_time_format};
use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::record::VehicleUpdate;

const CONTENT_TYPE: &str = "application/vnd.apache.parquet";

/// Single-request object upload. Implemented for the AWS SDK client.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    async fn upload(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StorageError>;
}

#[async_trait]
impl ObjectClient for aws_sdk_s3::Client {
    async fn upload(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StorageError> {
        self.put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| StorageError::ObjectStore(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }
}

/// Writes Parquet objects to an S3 bucket under a key prefix.
///
/// The whole file is encoded in memory and sent in one `PutObject`, so the
/// object either exists complete or not at all.
pub struct S3Storage<C = aws_sdk_s3::Client> {
    client: C,
    bucket: String,
    base_path: String,
    file_prefix: String,
    time_format: String,
}

impl<C: ObjectClient> S3Storage<C> {
    pub fn new(client: C, config: &StorageConfig) -> Result<Self, StorageError> {
        let bucket = config
            .bucket
            .clone()
            .filter(|b| !b.is_empty())
            .ok_or(StorageError::MissingSetting("bucket"))?;
        validate_time_format(&config.time_format)?;

        Ok(Self {
            client,
            bucket,
            base_path: config.base_path.trim_matches('/').to_string(),
            file_prefix: config.file_prefix.clone(),
            time_format: config.time_format.clone(),
        })
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn object_key(&self, file_name: &str) -> String {
        if self.base_path.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.base_path, file_name)
        }
    }

    /// Uploads `records` to the object named after `now`, returning its `s3://` URI.
    #[tracing::instrument(skip_all, fields(bucket = %self.bucket, records = records.len()))]
    pub async fn write_at(
        &self,
        records: &[VehicleUpdate],
        now: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        let key = self.object_key(&file_name(&self.file_prefix, &self.time_format, now)?);
        let body = parquet::encode(records)?;
        let size = body.len();

        self.client.upload(&self.bucket, &key, body).await?;

        let location = format!("s3://{}/{}", self.bucket, key);
        info!(location = %location, bytes = size, "Vehicle updates uploaded");
        Ok(location)
    }
}

#[async_trait]
impl<C: ObjectClient> StorageProvider for S3Storage<C> {
    async fn write(&self, records: &[VehicleUpdate]) -> Result<String, StorageError> {
        self.write_at(records, Utc::now()).await
    }
}
