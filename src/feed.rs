//! Flattening of decoded feeds into per-stop departure candidates.
//!
//! A [`FeedMessage`] nests stop visits inside trip updates inside entities.
//! [`flatten_trip_updates`] lifts the trip updates out of the entity list and
//! [`expand_stop_times`] turns each one into a row per stop visited.

use serde::Serialize;

use crate::gtfs_rt::trip_update::StopTimeUpdate;
use crate::gtfs_rt::{FeedEntity, FeedMessage, TripUpdate, VehiclePosition};

/// What a single feed entity carries.
#[derive(Debug, Clone, Copy)]
pub enum EntityPayload<'a> {
    TripUpdate(&'a TripUpdate),
    VehiclePosition(&'a VehiclePosition),
    Absent,
}

/// Classifies an entity. A trip update takes precedence if a producer
/// populates both payloads.
pub fn entity_payload(entity: &FeedEntity) -> EntityPayload<'_> {
    match (&entity.trip_update, &entity.vehicle) {
        (Some(trip_update), _) => EntityPayload::TripUpdate(trip_update),
        (None, Some(vehicle)) => EntityPayload::VehiclePosition(vehicle),
        (None, None) => EntityPayload::Absent,
    }
}

/// A trip update with its identifiers lifted out of the trip descriptor.
#[derive(Debug, Clone, Copy)]
pub struct FlatTrip<'a> {
    pub trip_id: &'a str,
    pub route_id: &'a str,
    pub stop_time_updates: &'a [StopTimeUpdate],
}

/// One stop visit of one trip, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartureCandidate {
    pub trip_id: String,
    pub route_id: String,
    pub stop_id: String,
    pub departure: i64,
}

/// Keeps the trip-update entities of `feed`, in feed order.
///
/// Vehicle positions and empty entities are skipped, as are trip updates whose
/// descriptor is missing a trip or route id.
pub fn flatten_trip_updates(feed: &FeedMessage) -> Vec<FlatTrip<'_>> {
    feed.entity
        .iter()
        .filter_map(|entity| match entity_payload(entity) {
            EntityPayload::TripUpdate(trip_update) => flatten_trip(trip_update),
            EntityPayload::VehiclePosition(_) | EntityPayload::Absent => None,
        })
        .collect()
}

fn flatten_trip(trip_update: &TripUpdate) -> Option<FlatTrip<'_>> {
    let trip = &trip_update.trip;
    Some(FlatTrip {
        trip_id: trip.trip_id.as_deref()?,
        route_id: trip.route_id.as_deref()?,
        stop_time_updates: &trip_update.stop_time_update,
    })
}

/// Expands one trip into a candidate per stop-time update, in order.
///
/// Updates without a departure time (or without a stop id) are dropped.
pub fn expand_stop_times(trip: &FlatTrip<'_>) -> Vec<DepartureCandidate> {
    trip.stop_time_updates
        .iter()
        .filter_map(|update| {
            let departure = update.departure.as_ref()?.time?;
            let stop_id = update.stop_id.as_deref()?;
            Some(DepartureCandidate {
                trip_id: trip.trip_id.to_string(),
                route_id: trip.route_id.to_string(),
                stop_id: stop_id.to_string(),
                departure,
            })
        })
        .collect()
}

/// Flattens and expands a whole feed.
pub fn expand_feed(feed: &FeedMessage) -> Vec<DepartureCandidate> {
    flatten_trip_updates(feed)
        .iter()
        .flat_map(expand_stop_times)
        .collect()
}
