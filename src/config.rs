//! Typed settings consumed by the fetch and storage stages.
//!
//! Loading them (flags, environment, `.env`) is the binary's job.

use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_BASE_PATH: &str = "output";
pub const DEFAULT_FILE_PREFIX: &str = "gtfs";
/// Millisecond resolution keeps back-to-back cycles from sharing a name.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S-%3f";

/// HTTP Basic credentials for the feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Builds credentials only when both parts are present and non-empty.
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Option<Self> {
        match (username, password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(Self { username, password })
            }
            _ => None,
        }
    }
}

/// An API key sent in a request header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyConfig {
    pub header_name: String,
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub feed_url: Url,
    pub credentials: Option<Credentials>,
    pub api_key: Option<ApiKeyConfig>,
    pub timeout: Duration,
}

impl FetchConfig {
    pub fn new(feed_url: Url) -> Self {
        Self {
            feed_url,
            credentials: None,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Which medium the record batches are written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Local,
    S3,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub kind: StorageKind,
    /// Directory for local writes, key prefix for object storage.
    pub base_path: String,
    pub bucket: Option<String>,
    /// `chrono` strftime pattern used in generated file names.
    pub time_format: String,
    pub file_prefix: String,
}

impl StorageConfig {
    pub fn local(base_path: impl Into<String>) -> Self {
        Self {
            kind: StorageKind::Local,
            base_path: base_path.into(),
            bucket: None,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }

    pub fn s3(bucket: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            kind: StorageKind::S3,
            base_path: base_path.into(),
            bucket: Some(bucket.into()),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }

    pub fn with_time_format(mut self, time_format: impl Into<String>) -> Self {
        self.time_format = time_format.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_require_both_parts() {
        assert_eq!(Credentials::from_parts(Some("u".into()), None), None);
        assert_eq!(Credentials::from_parts(None, Some("p".into())), None);
        assert_eq!(
            Credentials::from_parts(Some("".into()), Some("p".into())),
            None
        );
        assert_eq!(
            Credentials::from_parts(Some("u".into()), Some("p".into())),
            Some(Credentials {
                username: "u".into(),
                password: "p".into()
            })
        );
    }

    #[test]
    fn test_storage_config_defaults() {
        let local = StorageConfig::local("out");
        assert_eq!(local.kind, StorageKind::Local);
        assert_eq!(local.time_format, DEFAULT_TIME_FORMAT);
        assert!(local.bucket.is_none());

        let s3 = StorageConfig::s3("bucket", "gtfs/raw").with_time_format("%s");
        assert_eq!(s3.kind, StorageKind::S3);
        assert_eq!(s3.bucket.as_deref(), Some("bucket"));
        assert_eq!(s3.time_format, "%s");
    }
}
