//! Exactly one row per positioned vehicle.

use super::accessors::{enum_name, or_zero, string_or_empty, wrapping_i32};
use super::trip_update::{apply_trip, apply_vehicle};
use crate::gtfs_rt::VehiclePosition;
use crate::gtfs_rt::vehicle_position::{CongestionLevel, OccupancyStatus, VehicleStopStatus};
use crate::record::VehicleUpdate;

/// Builds the row for a vehicle position, or `None` when it carries no position.
pub fn normalize_vehicle_position(
    vehicle: &VehiclePosition,
    timestamp: i64,
) -> Option<VehicleUpdate> {
    let position = vehicle.position.as_ref()?;

    let mut row = VehicleUpdate {
        timestamp,
        latitude: position.latitude,
        longitude: position.longitude,
        bearing: or_zero(position.bearing),
        speed: or_zero(position.speed),
        stop_id: string_or_empty(&vehicle.stop_id),
        stop_sequence: wrapping_i32(vehicle.current_stop_sequence),
        status: enum_name::<VehicleStopStatus>(vehicle.current_status),
        congestion_level: enum_name::<CongestionLevel>(vehicle.congestion_level),
        occupancy_status: enum_name::<OccupancyStatus>(vehicle.occupancy_status),
        occupancy_percentage: wrapping_i32(vehicle.occupancy_percentage),
        ..Default::default()
    };

    if let Some(trip) = &vehicle.trip {
        apply_trip(&mut row, trip);
    }
    if let Some(descriptor) = &vehicle.vehicle {
        apply_vehicle(&mut row, descriptor);
    }

    Some(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs_rt::{Position, TripDescriptor, VehicleDescriptor};

    const TS: i64 = 1_700_000_000_000;

    fn position(latitude: f32, longitude: f32) -> Position {
        Position {
            latitude,
            longitude,
            bearing: None,
            odometer: None,
            speed: None,
        }
    }

    #[test]
    fn test_bare_position_yields_one_row_with_empty_trip() {
        let vehicle = VehiclePosition {
            position: Some(position(45.8, 16.0)),
            ..Default::default()
        };

        let row = normalize_vehicle_position(&vehicle, TS).unwrap();

        assert_eq!(row.latitude, 45.8);
        assert_eq!(row.longitude, 16.0);
        assert_eq!(row.timestamp, TS);
        assert_eq!(row.trip_id, "");
        assert_eq!(row.route_id, "");
        assert_eq!(row.vehicle_id, "");
        assert_eq!(row.vehicle_label, "");
        assert_eq!(row.status, "");
        assert_eq!(row.congestion_level, "");
        assert_eq!(row.occupancy_status, "");
        assert_eq!(row.occupancy_percentage, 0);
        assert_eq!((row.bearing, row.speed), (0.0, 0.0));
    }

    #[test]
    fn test_missing_position_yields_nothing() {
        let vehicle = VehiclePosition {
            trip: Some(TripDescriptor {
                trip_id: Some("T1".into()),
                ..Default::default()
            }),
            vehicle: Some(VehicleDescriptor {
                id: Some("V1".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(normalize_vehicle_position(&vehicle, TS).is_none());
    }

    #[test]
    fn test_full_vehicle_position() {
        let vehicle = VehiclePosition {
            trip: Some(TripDescriptor {
                trip_id: Some("T1".into()),
                route_id: Some("R1".into()),
                direction_id: Some(1),
                ..Default::default()
            }),
            vehicle: Some(VehicleDescriptor {
                id: Some("V1".into()),
                label: Some("Bus 1".into()),
                ..Default::default()
            }),
            position: Some(Position {
                bearing: Some(180.0),
                speed: Some(10.5),
                ..position(42.0, -71.0)
            }),
            current_stop_sequence: Some(4),
            stop_id: Some("S4".into()),
            current_status: Some(VehicleStopStatus::StoppedAt as i32),
            congestion_level: Some(CongestionLevel::StopAndGo as i32),
            occupancy_status: Some(OccupancyStatus::FewSeatsAvailable as i32),
            occupancy_percentage: Some(55),
            ..Default::default()
        };

        let row = normalize_vehicle_position(&vehicle, TS).unwrap();

        assert_eq!(row.trip_id, "T1");
        assert_eq!(row.route_id, "R1");
        assert_eq!(row.direction_id, 1);
        assert_eq!(row.vehicle_id, "V1");
        assert_eq!(row.vehicle_label, "Bus 1");
        assert_eq!((row.bearing, row.speed), (180.0, 10.5));
        assert_eq!(row.stop_id, "S4");
        assert_eq!(row.stop_sequence, 4);
        assert_eq!(row.status, "STOPPED_AT");
        assert_eq!(row.congestion_level, "STOP_AND_GO");
        assert_eq!(row.occupancy_status, "FEW_SEATS_AVAILABLE");
        assert_eq!(row.occupancy_percentage, 55);
        assert_eq!(row.arrival_time, 0);
        assert_eq!(row.departure_delay, 0);
    }
}
