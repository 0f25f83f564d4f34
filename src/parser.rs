//! Protobuf parser for GTFS Realtime feeds.

use prost::Message;

use crate::error::FetchError;
use crate::gtfs_rt::FeedMessage;

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns [`FetchError::Decode`] if the bytes are not valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage, FetchError> {
    Ok(FeedMessage::decode(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_bytes_returns_default_feed() {
        // An empty byte array decodes to a FeedMessage with default values
        let feed = parse_feed(&[]).unwrap();
        assert_eq!(feed.header.gtfs_realtime_version, "");
        assert!(feed.entity.is_empty());
    }

    #[test]
    fn test_parse_invalid_bytes() {
        let invalid_bytes = vec![0xFF, 0xFE, 0x00, 0x01];
        let result = parse_feed(&invalid_bytes);
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[test]
    fn test_parse_keeps_trip_presence() {
        use crate::gtfs_rt::{FeedEntity, FeedHeader, TripDescriptor, TripUpdate};

        let feed = FeedMessage {
            header: FeedHeader {
                gtfs_realtime_version: "2.0".to_string(),
                timestamp: Some(1234567890),
                incrementality: None,
                feed_version: None,
            },
            entity: vec![
                FeedEntity {
                    id: "with-trip".to_string(),
                    trip_update: Some(TripUpdate {
                        trip: Some(TripDescriptor::default()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                FeedEntity {
                    id: "without-trip".to_string(),
                    trip_update: Some(TripUpdate::default()),
                    ..Default::default()
                },
            ],
        };
        let parsed = parse_feed(&feed.encode_to_vec()).unwrap();

        assert_eq!(parsed.header.timestamp, Some(1234567890));
        assert!(parsed.entity[0].trip_update.as_ref().unwrap().trip.is_some());
        assert!(parsed.entity[1].trip_update.as_ref().unwrap().trip.is_none());
    }
}
