//! Collapse optional wire fields into zero-valued defaults.

use crate::gtfs_rt::{trip_descriptor, vehicle_position};

/// Returns the value, or the type's zero value when absent.
pub fn or_zero<T: Copy + Default>(value: Option<T>) -> T {
    value.unwrap_or_default()
}

/// Returns an owned copy of the string, or `""` when absent.
pub fn string_or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Converts optional epoch seconds to epoch milliseconds, `0` when absent.
pub fn millis_or_zero(seconds: Option<i64>) -> i64 {
    seconds.map_or(0, |s| s.saturating_mul(1000))
}

/// Reads an unsigned wire value into a signed column, two's-complement wrapping
/// values above `i32::MAX`.
pub fn wrapping_i32(value: Option<u32>) -> i32 {
    or_zero(value) as i32
}

/// GTFS-RT enums that render as their proto value name.
pub trait WireEnum: TryFrom<i32> {
    fn wire_name(&self) -> &'static str;
}

macro_rules! wire_enum {
    ($($ty:ty),* $(,)?) => {
        $(
            impl WireEnum for $ty {
                fn wire_name(&self) -> &'static str {
                    self.as_str_name()
                }
            }
        )*
    };
}

wire_enum!(
    trip_descriptor::ScheduleRelationship,
    vehicle_position::VehicleStopStatus,
    vehicle_position::CongestionLevel,
    vehicle_position::OccupancyStatus,
);

/// Renders an optional enum as its proto name (`"STOPPED_AT"`), `""` when absent.
///
/// Numbers this build does not know are kept as their decimal string.
pub fn enum_name<E: WireEnum>(value: Option<i32>) -> String {
    match value {
        None => String::new(),
        Some(raw) => E::try_from(raw)
            .map(|e| e.wire_name().to_string())
            .unwrap_or_else(|_| raw.to_string()),
    }
}
