//! Flattens GTFS-RT feed entities into [`VehicleUpdate`] rows.
//!
//! Normalization is total: entities missing the sub-structure a row needs
//! (a trip descriptor, a position) contribute no rows instead of failing.

pub mod accessors;
mod trip_update;
mod vehicle_position;

pub use trip_update::normalize_trip_update;
pub use vehicle_position::normalize_vehicle_position;

use chrono::{DateTime, Utc};

use crate::gtfs_rt::{FeedEntity, FeedMessage};
use crate::record::VehicleUpdate;

/// Rows for a single entity: its trip update stops first, then its vehicle position.
pub fn normalize_entity(entity: &FeedEntity, fetched_at: DateTime<Utc>) -> Vec<VehicleUpdate> {
    let timestamp = fetched_at.timestamp_millis();
    let mut rows = Vec::new();

    if let Some(update) = &entity.trip_update {
        rows.extend(normalize_trip_update(update, timestamp));
    }
    if let Some(vehicle) = &entity.vehicle {
        rows.extend(normalize_vehicle_position(vehicle, timestamp));
    }

    rows
}

/// Rows for a whole feed, grouped by entity in feed order, all stamped with `fetched_at`.
pub fn normalize_feed(feed: &FeedMessage, fetched_at: DateTime<Utc>) -> Vec<VehicleUpdate> {
    feed.entity
        .iter()
        .flat_map(|entity| normalize_entity(entity, fetched_at))
        .collect()
}
