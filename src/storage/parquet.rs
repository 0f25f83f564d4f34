//! Parquet encoding shared by every storage backend.
//!
//! Both backends write the bytes produced by [`encode`], so files differ only
//! in where they are stored.

use std::path::Path;

use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;

use crate::error::StorageError;
use crate::record::{self, VehicleUpdate};

pub const EXTENSION: &str = "parquet";

/// ZSTD-compressed pages, one codec for every column.
pub fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .build()
}

/// Encodes `records` as a complete Parquet file, footer included.
pub fn encode(records: &[VehicleUpdate]) -> Result<Bytes, StorageError> {
    let batch = record::to_record_batch(records)?;

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, record::schema(), Some(writer_properties()))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(Bytes::from(buf))
}

/// Reads every row of a Parquet file produced by [`encode`], in file order.
pub fn decode(bytes: Bytes) -> Result<Vec<VehicleUpdate>, StorageError> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)?.build()?;

    let mut rows = Vec::new();
    for batch in reader {
        rows.extend(record::from_record_batch(&batch?)?);
    }
    Ok(rows)
}

pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<VehicleUpdate>, StorageError> {
    let bytes = std::fs::read(path)?;
    decode(Bytes::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parquet::file::reader::{FileReader, SerializedFileReader};

    fn rows() -> Vec<VehicleUpdate> {
        vec![
            VehicleUpdate {
                timestamp: 1_700_000_000_000,
                trip_id: "T1".into(),
                stop_id: "S1".into(),
                arrival_delay: 30,
                ..Default::default()
            },
            VehicleUpdate {
                timestamp: 1_700_000_000_000,
                latitude: 45.8,
                longitude: 16.0,
                status: "IN_TRANSIT_TO".into(),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_encode_decode_preserves_rows() {
        let bytes = encode(&rows()).unwrap();
        assert_eq!(&bytes[..4], b"PAR1");
        assert_eq!(decode(bytes).unwrap(), rows());
    }

    #[test]
    fn test_every_column_is_zstd() {
        let bytes = encode(&rows()).unwrap();
        let reader = SerializedFileReader::new(bytes).unwrap();
        let metadata = reader.metadata();

        assert_eq!(metadata.file_metadata().num_rows(), 2);
        let row_group = metadata.row_group(0);
        assert_eq!(row_group.num_columns(), 25);
        for column in row_group.columns() {
            assert!(matches!(column.compression(), Compression::ZSTD(_)));
        }
    }

    #[test]
    fn test_empty_batch_is_a_valid_file() {
        let bytes = encode(&[]).unwrap();
        assert!(decode(bytes).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode(Bytes::from_static(b"not parquet")).is_err());
    }
}
