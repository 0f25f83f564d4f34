//! Error taxonomy for the fetch, storage and pipeline stages.
//!
//! Normalization has no error type: degenerate entities contribute zero rows.

use thiserror::Error;

/// Failures while retrieving and decoding the realtime feed.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection, TLS, timeout or body read failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("unexpected status code: {status}")]
    Protocol { status: reqwest::StatusCode },

    /// The body is not a valid GTFS-RT `FeedMessage`.
    #[error("unmarshal proto: {0}")]
    Decode(#[from] prost::DecodeError),

    /// The body decoded but carries no entities.
    #[error("feed decoded with no entities")]
    EmptyResult,

    /// The caller cancelled the fetch before it completed.
    #[error("fetch cancelled")]
    Cancelled,

    /// A credential or API key cannot be sent as an HTTP header value.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

impl FetchError {
    /// Short, stable identifier for log fields.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "network_error",
            Self::Protocol { .. } => "protocol_error",
            Self::Decode(_) => "decode_error",
            Self::EmptyResult => "empty_result",
            Self::Cancelled => "cancelled",
            Self::InvalidHeader(_) => "invalid_header",
        }
    }
}

/// Failures while encoding or persisting a record batch.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Object storage request failed; carries the SDK's full error context.
    #[error("object store error: {0}")]
    ObjectStore(String),

    /// A file with the generated name is already present.
    #[error("refusing to overwrite existing file: {0}")]
    AlreadyExists(String),

    #[error("invalid filename time format: {0:?}")]
    InvalidTimeFormat(String),

    /// A file read back does not have the vehicle update schema.
    #[error("schema mismatch: {0}")]
    Schema(String),

    #[error("missing storage setting: {0}")]
    MissingSetting(&'static str),
}

impl StorageError {
    /// Short, stable identifier for log fields.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io_error",
            Self::Parquet(_) => "parquet_error",
            Self::Arrow(_) => "arrow_error",
            Self::ObjectStore(_) => "object_store_error",
            Self::AlreadyExists(_) => "already_exists",
            Self::InvalidTimeFormat(_) => "invalid_time_format",
            Self::Schema(_) => "schema_mismatch",
            Self::MissingSetting(_) => "missing_setting",
        }
    }
}

/// A failed fetch-transform-write cycle. Stage errors pass through unchanged.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("fetch feed: {0}")]
    Fetch(#[from] FetchError),

    #[error("write updates: {0}")]
    Storage(#[from] StorageError),
}

impl PipelineError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Fetch(e) => e.code(),
            Self::Storage(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_keeps_stage_code() {
        let err = PipelineError::from(FetchError::EmptyResult);
        assert_eq!(err.code(), "empty_result");

        let err = PipelineError::from(StorageError::AlreadyExists("out/a.parquet".into()));
        assert_eq!(err.code(), "already_exists");
        assert!(err.to_string().contains("out/a.parquet"));
    }

    #[test]
    fn test_protocol_error_message_has_status() {
        let err = FetchError::Protocol {
            status: reqwest::StatusCode::FORBIDDEN,
        };
        assert_eq!(err.code(), "protocol_error");
        assert!(err.to_string().contains("403"));
    }
}
