//! Departure filtering: the query surface over expanded candidates.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::feed::DepartureCandidate;
use crate::stops::StopLabels;

/// Time zone of the NYCT feeds.
pub const DEFAULT_ZONE: Tz = chrono_tz::America::New_York;

/// Platform suffixes used by the NYCT feeds for stop ids and trip ids.
pub const DIRECTIONS: [&str; 2] = ["N", "S"];

/// What departures to look for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartureQuery {
    pub stop_ids: HashSet<String>,
    pub direction: Option<String>,
    pub route: Option<String>,
}

impl DepartureQuery {
    pub fn new<I, S>(stop_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stop_ids: stop_ids.into_iter().map(Into::into).collect(),
            direction: None,
            route: None,
        }
    }

    pub fn direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = Some(direction.into());
        self
    }

    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Replaces unsuffixed stop ids with their directional platform ids.
    pub fn with_platforms(mut self) -> Self {
        self.stop_ids = expand_stop_ids(&self.stop_ids, self.direction.as_deref());
        self
    }

    fn matches(&self, candidate: &DepartureCandidate, as_of: i64) -> bool {
        self.stop_ids.contains(&candidate.stop_id)
            && self
                .direction
                .as_deref()
                .is_none_or(|direction| heads_in_direction(&candidate.trip_id, direction))
            && self
                .route
                .as_deref()
                .is_none_or(|route| candidate.route_id == route)
            && candidate.departure >= as_of
    }
}

/// Whether a trip runs in `direction`.
///
/// The NYCT feeds encode direction as a single character closing the trip id
/// (`048200_N..S` runs southbound). Trip ids carrying a shape after the
/// direction (`047650_N..N01R`) are read at the character following `..`.
pub fn heads_in_direction(trip_id: &str, direction: &str) -> bool {
    match trip_id.rsplit_once("..") {
        Some((_, path)) => path.starts_with(direction),
        None => trip_id.ends_with(direction),
    }
}

/// Adds the directional platform ids for each stop id without a direction
/// suffix. With a `direction`, only that platform is added.
///
/// `R09` becomes `R09N` and `R09S`; `R09S` is left alone.
pub fn expand_stop_ids(stop_ids: &HashSet<String>, direction: Option<&str>) -> HashSet<String> {
    let mut expanded = HashSet::with_capacity(stop_ids.len() * 2);
    for stop_id in stop_ids {
        if DIRECTIONS.iter().any(|d| stop_id.ends_with(d)) {
            expanded.insert(stop_id.clone());
            continue;
        }
        match direction {
            Some(direction) => {
                expanded.insert(format!("{stop_id}{direction}"));
            }
            None => {
                expanded.extend(DIRECTIONS.iter().map(|d| format!("{stop_id}{d}")));
            }
        }
    }
    expanded
}

/// How matching departures are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOptions {
    /// Civil time zone for `departure_local`.
    pub zone: Tz,
    /// Order results by departure time; otherwise feed order is kept.
    pub sort: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            zone: DEFAULT_ZONE,
            sort: true,
        }
    }
}

/// A departure that matched a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartureRecord {
    pub trip_id: String,
    pub route_id: String,
    pub stop_id: String,
    pub stop_label: String,
    pub departure: i64,
    pub departure_local: DateTime<Tz>,
}

/// Selects the candidates matching `query` that depart at or after `as_of`.
///
/// The time comparison is made in epoch seconds; `departure_local` is only
/// for display. `candidates` is left untouched.
pub fn filter_departures<L: StopLabels + ?Sized>(
    candidates: &[DepartureCandidate],
    query: &DepartureQuery,
    as_of: DateTime<Utc>,
    options: &FilterOptions,
    labels: &L,
) -> Vec<DepartureRecord> {
    let as_of = as_of.timestamp();

    let mut records: Vec<DepartureRecord> = candidates
        .iter()
        .filter(|candidate| query.matches(candidate, as_of))
        .filter_map(|candidate| {
            let departure_local =
                DateTime::from_timestamp(candidate.departure, 0)?.with_timezone(&options.zone);
            Some(DepartureRecord {
                trip_id: candidate.trip_id.clone(),
                route_id: candidate.route_id.clone(),
                stop_id: candidate.stop_id.clone(),
                stop_label: labels.label_for(&candidate.stop_id).to_string(),
                departure: candidate.departure,
                departure_local,
            })
        })
        .collect();

    if options.sort {
        records.sort_by_key(|record| record.departure);
    }

    records
}
