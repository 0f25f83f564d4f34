//! The flat vehicle update row and its Arrow column layout.
//!
//! Every column is non-nullable: absent wire fields are stored as `""`, `0`
//! or the Unix epoch, so files share one stable schema whatever the feed
//! chose to populate.

use std::sync::{Arc, LazyLock};

use arrow::array::{
    Array, ArrayRef, Float32Array, Int32Array, RecordBatch, StringArray,
    TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use serde::Serialize;

use crate::error::StorageError;

const UTC: &str = "UTC";

/// One row of output: either a single stop of a trip update or a vehicle position.
///
/// Time columns hold milliseconds since the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehicleUpdate {
    /// Fetch time shared by every row of a cycle.
    pub timestamp: i64,

    // trip
    pub trip_id: String,
    pub route_id: String,
    pub direction_id: i32,
    pub start_time: String,
    pub start_date: String,
    pub schedule_relationship: String,

    // vehicle
    pub vehicle_id: String,
    pub vehicle_label: String,

    // position, zero for trip update rows
    pub latitude: f32,
    pub longitude: f32,
    pub bearing: f32,
    pub speed: f32,

    // stop
    pub stop_id: String,
    pub stop_sequence: i32,

    pub arrival_time: i64,
    pub arrival_delay: i32,
    pub arrival_uncertainty: i32,

    pub departure_time: i64,
    pub departure_delay: i32,
    pub departure_uncertainty: i32,

    // vehicle position only
    pub status: String,
    pub congestion_level: String,
    pub occupancy_status: String,
    pub occupancy_percentage: i32,
}

static SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    let timestamp = || DataType::Timestamp(TimeUnit::Millisecond, Some(UTC.into()));
    let utf8 = |name: &str| Field::new(name, DataType::Utf8, false);
    let int32 = |name: &str| Field::new(name, DataType::Int32, false);
    let float32 = |name: &str| Field::new(name, DataType::Float32, false);

    Arc::new(Schema::new(vec![
        Field::new("timestamp", timestamp(), false),
        utf8("trip_id"),
        utf8("route_id"),
        int32("direction_id"),
        utf8("start_time"),
        utf8("start_date"),
        utf8("schedule_relationship"),
        utf8("vehicle_id"),
        utf8("vehicle_label"),
        float32("latitude"),
        float32("longitude"),
        float32("bearing"),
        float32("speed"),
        utf8("stop_id"),
        int32("stop_sequence"),
        Field::new("arrival_time", timestamp(), false),
        int32("arrival_delay"),
        int32("arrival_uncertainty"),
        Field::new("departure_time", timestamp(), false),
        int32("departure_delay"),
        int32("departure_uncertainty"),
        utf8("status"),
        utf8("congestion_level"),
        utf8("occupancy_status"),
        int32("occupancy_percentage"),
    ]))
});

/// Arrow schema of a [`VehicleUpdate`] batch, in column order.
pub fn schema() -> SchemaRef {
    SCHEMA.clone()
}

/// Builds a single record batch holding `records` in order.
pub fn to_record_batch(records: &[VehicleUpdate]) -> Result<RecordBatch, StorageError> {
    let strings = |f: fn(&VehicleUpdate) -> &str| -> ArrayRef {
        Arc::new(StringArray::from_iter_values(records.iter().map(f)))
    };
    let int32s = |f: fn(&VehicleUpdate) -> i32| -> ArrayRef {
        Arc::new(Int32Array::from_iter_values(records.iter().map(f)))
    };
    let float32s = |f: fn(&VehicleUpdate) -> f32| -> ArrayRef {
        Arc::new(Float32Array::from_iter_values(records.iter().map(f)))
    };
    let millis = |f: fn(&VehicleUpdate) -> i64| -> ArrayRef {
        Arc::new(
            TimestampMillisecondArray::from_iter_values(records.iter().map(f)).with_timezone(UTC),
        )
    };

    let columns = vec![
        millis(|r| r.timestamp),
        strings(|r| r.trip_id.as_str()),
        strings(|r| r.route_id.as_str()),
        int32s(|r| r.direction_id),
        strings(|r| r.start_time.as_str()),
        strings(|r| r.start_date.as_str()),
        strings(|r| r.schedule_relationship.as_str()),
        strings(|r| r.vehicle_id.as_str()),
        strings(|r| r.vehicle_label.as_str()),
        float32s(|r| r.latitude),
        float32s(|r| r.longitude),
        float32s(|r| r.bearing),
        float32s(|r| r.speed),
        strings(|r| r.stop_id.as_str()),
        int32s(|r| r.stop_sequence),
        millis(|r| r.arrival_time),
        int32s(|r| r.arrival_delay),
        int32s(|r| r.arrival_uncertainty),
        millis(|r| r.departure_time),
        int32s(|r| r.departure_delay),
        int32s(|r| r.departure_uncertainty),
        strings(|r| r.status.as_str()),
        strings(|r| r.congestion_level.as_str()),
        strings(|r| r.occupancy_status.as_str()),
        int32s(|r| r.occupancy_percentage),
    ];

    Ok(RecordBatch::try_new(schema(), columns)?)
}

fn column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a T, StorageError> {
    let array = batch
        .column_by_name(name)
        .ok_or_else(|| StorageError::Schema(format!("missing column {name}")))?;
    if array.null_count() > 0 {
        return Err(StorageError::Schema(format!("column {name} contains nulls")));
    }
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| StorageError::Schema(format!("column {name} has type {}", array.data_type())))
}

/// Reads rows back out of a batch produced by [`to_record_batch`].
///
/// Columns are looked up by name, so a batch with extra columns is accepted.
pub fn from_record_batch(batch: &RecordBatch) -> Result<Vec<VehicleUpdate>, StorageError> {
    let timestamp = column::<TimestampMillisecondArray>(batch, "timestamp")?;
    let trip_id = column::<StringArray>(batch, "trip_id")?;
    let route_id = column::<StringArray>(batch, "route_id")?;
    let direction_id = column::<Int32Array>(batch, "direction_id")?;
    let start_time = column::<StringArray>(batch, "start_time")?;
    let start_date = column::<StringArray>(batch, "start_date")?;
    let schedule_relationship = column::<StringArray>(batch, "schedule_relationship")?;
    let vehicle_id = column::<StringArray>(batch, "vehicle_id")?;
    let vehicle_label = column::<StringArray>(batch, "vehicle_label")?;
    let latitude = column::<Float32Array>(batch, "latitude")?;
    let longitude = column::<Float32Array>(batch, "longitude")?;
    let bearing = column::<Float32Array>(batch, "bearing")?;
    let speed = column::<Float32Array>(batch, "speed")?;
    let stop_id = column::<StringArray>(batch, "stop_id")?;
    let stop_sequence = column::<Int32Array>(batch, "stop_sequence")?;
    let arrival_time = column::<TimestampMillisecondArray>(batch, "arrival_time")?;
    let arrival_delay = column::<Int32Array>(batch, "arrival_delay")?;
    let arrival_uncertainty = column::<Int32Array>(batch, "arrival_uncertainty")?;
    let departure_time = column::<TimestampMillisecondArray>(batch, "departure_time")?;
    let departure_delay = column::<Int32Array>(batch, "departure_delay")?;
    let departure_uncertainty = column::<Int32Array>(batch, "departure_uncertainty")?;
    let status = column::<StringArray>(batch, "status")?;
    let congestion_level = column::<StringArray>(batch, "congestion_level")?;
    let occupancy_status = column::<StringArray>(batch, "occupancy_status")?;
    let occupancy_percentage = column::<Int32Array>(batch, "occupancy_percentage")?;

    let rows = (0..batch.num_rows())
        .map(|i| VehicleUpdate {
            timestamp: timestamp.value(i),
            trip_id: trip_id.value(i).to_string(),
            route_id: route_id.value(i).to_string(),
            direction_id: direction_id.value(i),
            start_time: start_time.value(i).to_string(),
            start_date: start_date.value(i).to_string(),
            schedule_relationship: schedule_relationship.value(i).to_string(),
            vehicle_id: vehicle_id.value(i).to_string(),
            vehicle_label: vehicle_label.value(i).to_string(),
            latitude: latitude.value(i),
            longitude: longitude.value(i),
            bearing: bearing.value(i),
            speed: speed.value(i),
            stop_id: stop_id.value(i).to_string(),
            stop_sequence: stop_sequence.value(i),
            arrival_time: arrival_time.value(i),
            arrival_delay: arrival_delay.value(i),
            arrival_uncertainty: arrival_uncertainty.value(i),
            departure_time: departure_time.value(i),
            departure_delay: departure_delay.value(i),
            departure_uncertainty: departure_uncertainty.value(i),
            status: status.value(i).to_string(),
            congestion_level: congestion_level.value(i).to_string(),
            occupancy_status: occupancy_status.value(i).to_string(),
            occupancy_percentage: occupancy_percentage.value(i),
        })
        .collect();

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VehicleUpdate {
        VehicleUpdate {
            timestamp: 1_700_000_000_123,
            trip_id: "T1".into(),
            route_id: "R1".into(),
            direction_id: 1,
            stop_id: "S1".into(),
            stop_sequence: -1,
            arrival_time: 1_700_000_060_000,
            arrival_delay: 30,
            status: "STOPPED_AT".into(),
            latitude: 45.8,
            longitude: 16.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_schema_has_one_column_per_field() {
        let schema = schema();
        assert_eq!(schema.fields().len(), 25);
        assert_eq!(schema.field(0).name(), "timestamp");
        assert!(schema.fields().iter().all(|f| !f.is_nullable()));
        assert_eq!(
            schema.field_with_name("arrival_time").unwrap().data_type(),
            &DataType::Timestamp(TimeUnit::Millisecond, Some(UTC.into()))
        );
    }

    #[test]
    fn test_batch_preserves_rows_and_order() {
        let first = sample();
        let second = VehicleUpdate {
            stop_id: "S2".into(),
            ..sample()
        };
        let batch = to_record_batch(&[first.clone(), second.clone()]).unwrap();

        assert_eq!(batch.num_rows(), 2);
        assert_eq!(from_record_batch(&batch).unwrap(), vec![first, second]);
    }

    #[test]
    fn test_empty_batch_keeps_schema() {
        let batch = to_record_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.schema(), schema());
        assert!(from_record_batch(&batch).unwrap().is_empty());
    }

    #[test]
    fn test_extra_column_is_ignored() {
        let batch = to_record_batch(&[sample()]).unwrap();
        let mut fields: Vec<Field> = schema().fields().iter().map(|f| f.as_ref().clone()).collect();
        fields.push(Field::new("feed_id", DataType::Utf8, false));
        let mut columns = batch.columns().to_vec();
        columns.push(Arc::new(StringArray::from(vec!["zagreb"])));

        let wider = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap();

        assert_eq!(from_record_batch(&wider).unwrap(), vec![sample()]);
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let batch = to_record_batch(&[sample()]).unwrap();
        let trimmed = batch.project(&[0, 1]).unwrap();
        let err = from_record_batch(&trimmed).unwrap_err();
        assert!(matches!(err, StorageError::Schema(_)));
    }
}
