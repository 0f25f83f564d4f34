//! One row per stop-time update of a trip update.

use super::accessors::{
    enum_name, millis_or_zero, or_zero, string_or_empty, wrapping_i32,
};
use crate::gtfs_rt::trip_descriptor::ScheduleRelationship;
use crate::gtfs_rt::trip_update::StopTimeEvent;
use crate::gtfs_rt::{TripDescriptor, TripUpdate, VehicleDescriptor};
use crate::record::VehicleUpdate;

/// Trip descriptor columns, shared by rows from both entity kinds.
pub(super) fn apply_trip(row: &mut VehicleUpdate, trip: &TripDescriptor) {
    row.trip_id = string_or_empty(&trip.trip_id);
    row.route_id = string_or_empty(&trip.route_id);
    row.direction_id = wrapping_i32(trip.direction_id);
    row.start_time = string_or_empty(&trip.start_time);
    row.start_date = string_or_empty(&trip.start_date);
    row.schedule_relationship = enum_name::<ScheduleRelationship>(trip.schedule_relationship);
}

pub(super) fn apply_vehicle(row: &mut VehicleUpdate, vehicle: &VehicleDescriptor) {
    row.vehicle_id = string_or_empty(&vehicle.id);
    row.vehicle_label = string_or_empty(&vehicle.label);
}

/// `(time, delay, uncertainty)`; all zero when the event is absent.
fn event_fields(event: Option<&StopTimeEvent>) -> (i64, i32, i32) {
    event.map_or((0, 0, 0), |e| {
        (
            millis_or_zero(e.time),
            or_zero(e.delay),
            or_zero(e.uncertainty),
        )
    })
}

/// Expands a trip update into one row per stop-time update, in feed order.
///
/// A trip update without a trip descriptor yields no rows.
pub fn normalize_trip_update(update: &TripUpdate, timestamp: i64) -> Vec<VehicleUpdate> {
    let Some(trip) = &update.trip else {
        return Vec::new();
    };

    let mut base = VehicleUpdate {
        timestamp,
        ..Default::default()
    };
    apply_trip(&mut base, trip);
    if let Some(vehicle) = &update.vehicle {
        apply_vehicle(&mut base, vehicle);
    }

    update
        .stop_time_update
        .iter()
        .map(|stu| {
            let (arrival_time, arrival_delay, arrival_uncertainty) =
                event_fields(stu.arrival.as_ref());
            let (departure_time, departure_delay, departure_uncertainty) =
                event_fields(stu.departure.as_ref());

            VehicleUpdate {
                stop_id: string_or_empty(&stu.stop_id),
                stop_sequence: wrapping_i32(stu.stop_sequence),
                arrival_time,
                arrival_delay,
                arrival_uncertainty,
                departure_time,
                departure_delay,
                departure_uncertainty,
                ..base.clone()
            }
        })
        .collect()
}
