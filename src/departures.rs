//! The end-to-end departure query: fetch, merge, filter.

use chrono::{DateTime, Utc};

use crate::error::QueryError;
use crate::fetch::FeedFetcher;
use crate::merge::{MergeOptions, collect_candidates};
use crate::query::{DepartureQuery, DepartureRecord, FilterOptions, filter_departures};
use crate::stops::StopLabels;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub merge: MergeOptions,
    pub filter: FilterOptions,
}

/// Matching departures plus the endpoints skipped on the way.
#[derive(Debug, Default)]
pub struct Departures {
    pub records: Vec<DepartureRecord>,
    /// Only populated under [`FailurePolicy::Partial`](crate::merge::FailurePolicy::Partial).
    pub failures: Vec<QueryError>,
}

/// Upcoming departures across `endpoints` matching `query` as of `as_of`.
///
/// Empty `records` is a successful answer. When every endpoint failed the
/// query fails with the first endpoint's error, whatever the failure policy.
pub async fn query_departures<F, L>(
    fetcher: &F,
    endpoints: &[String],
    query: &DepartureQuery,
    as_of: DateTime<Utc>,
    options: &QueryOptions,
    labels: &L,
) -> Result<Departures, QueryError>
where
    F: FeedFetcher + ?Sized,
    L: StopLabels + ?Sized,
{
    let mut merged = collect_candidates(fetcher, endpoints, &options.merge).await?;
    if !endpoints.is_empty() && merged.failures.len() == endpoints.len() {
        if !merged.failures.is_empty() {
            return Err(merged.failures.swap_remove(0));
        }
    }
    let records = filter_departures(
        &merged.candidates,
        query,
        as_of,
        &options.filter,
        labels,
    );
    Ok(Departures {
        records,
        failures: merged.failures,
    })
}
