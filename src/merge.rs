//! Fetching several feed endpoints and merging their candidates.

use std::time::Duration;

use futures::future::{join_all, try_join_all};
use tracing::{debug, info, warn};

use crate::error::QueryError;
use crate::feed::{DepartureCandidate, expand_feed};
use crate::fetch::FeedFetcher;
use crate::parser::parse_feed;

/// What to do when one endpoint of a multi-feed query fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the whole query on the first failure.
    #[default]
    FailFast,
    /// Drop the failed endpoint and keep the others.
    Partial,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    pub policy: FailurePolicy,
    /// Upper bound on the whole join; `None` leaves timeouts to the fetcher.
    pub deadline: Option<Duration>,
}

/// Candidates of every endpoint that succeeded, in endpoint order.
#[derive(Debug, Default)]
pub struct MergedCandidates {
    pub candidates: Vec<DepartureCandidate>,
    /// Endpoints skipped under [`FailurePolicy::Partial`].
    pub failures: Vec<QueryError>,
}

/// Fetches, decodes and expands `endpoints` concurrently, concatenating the
/// results in endpoint order.
///
/// Nothing is merged until every endpoint has answered. Dropping the returned
/// future cancels the fetches still in flight.
#[tracing::instrument(skip(fetcher, endpoints), fields(endpoints = endpoints.len()))]
pub async fn collect_candidates<F: FeedFetcher + ?Sized>(
    fetcher: &F,
    endpoints: &[String],
    options: &MergeOptions,
) -> Result<MergedCandidates, QueryError> {
    let join = join_endpoints(fetcher, endpoints, options.policy);
    let results = match options.deadline {
        Some(deadline) => tokio::time::timeout(deadline, join)
            .await
            .map_err(|_| QueryError::DeadlineExceeded(deadline))??,
        None => join.await?,
    };

    let mut merged = MergedCandidates::default();
    for result in results {
        match result {
            Ok(candidates) => merged.candidates.extend(candidates),
            Err(err) => {
                warn!(endpoint = err.endpoint().unwrap_or_default(), error = %err, "Skipping failed feed");
                merged.failures.push(err);
            }
        }
    }

    info!(
        candidates = merged.candidates.len(),
        failed = merged.failures.len(),
        "Feeds merged"
    );
    Ok(merged)
}

type EndpointResult = Result<Vec<DepartureCandidate>, QueryError>;

/// Under `FailFast` the first error is returned and the other fetches are
/// dropped; under `Partial` every per-endpoint result is kept.
async fn join_endpoints<F: FeedFetcher + ?Sized>(
    fetcher: &F,
    endpoints: &[String],
    policy: FailurePolicy,
) -> Result<Vec<EndpointResult>, QueryError> {
    let loads = endpoints
        .iter()
        .map(|endpoint| load_endpoint(fetcher, endpoint));
    match policy {
        FailurePolicy::FailFast => Ok(try_join_all(loads)
            .await?
            .into_iter()
            .map(Ok)
            .collect()),
        FailurePolicy::Partial => Ok(join_all(loads).await),
    }
}

async fn load_endpoint<F: FeedFetcher + ?Sized>(fetcher: &F, endpoint: &str) -> EndpointResult {
    let bytes = fetcher
        .fetch(endpoint)
        .await
        .map_err(|source| QueryError::FetchFailed {
            endpoint: endpoint.to_string(),
            source,
        })?;
    let feed = parse_feed(&bytes).map_err(|source| QueryError::DecodeFailed {
        endpoint: endpoint.to_string(),
        source,
    })?;
    let candidates = expand_feed(&feed);
    debug!(
        endpoint,
        entity_count = feed.entity.len(),
        candidates = candidates.len(),
        "Feed expanded"
    );
    Ok(candidates)
}

#[cfg(test)]
pub(crate) mod stub {
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use prost::Message;

    use crate::error::FetchError;
    use crate::fetch::FeedFetcher;
    use crate::gtfs_rt::FeedMessage;

    pub enum Reply {
        Feed(Vec<u8>),
        Unauthorized,
        Slow(Duration, Vec<u8>),
    }

    /// Serves canned replies keyed by endpoint.
    #[derive(Default)]
    pub struct StubFetcher {
        replies: HashMap<String, Reply>,
    }

    impl StubFetcher {
        pub fn feed(mut self, endpoint: &str, feed: &FeedMessage) -> Self {
            self.replies
                .insert(endpoint.to_string(), Reply::Feed(feed.encode_to_vec()));
            self
        }

        pub fn reply(mut self, endpoint: &str, reply: Reply) -> Self {
            self.replies.insert(endpoint.to_string(), reply);
            self
        }
    }

    #[async_trait]
    impl FeedFetcher for StubFetcher {
        async fn fetch(&self, endpoint: &str) -> Result<Bytes, FetchError> {
            match self.replies.get(endpoint) {
                Some(Reply::Feed(bytes)) => Ok(Bytes::from(bytes.clone())),
                Some(Reply::Unauthorized) => Err(FetchError::Unauthorized),
                Some(Reply::Slow(delay, bytes)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(Bytes::from(bytes.clone()))
                }
                None => Err(FetchError::NotFound),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::stub::{Reply, StubFetcher};
    use super::*;
    use crate::error::FetchError;
    use crate::feed::fixtures::{feed, stop, trip_entity, vehicle_entity};
    use crate::query::{DepartureQuery, FilterOptions, filter_departures};
    use crate::stops::NoLabels;
    use chrono::{TimeZone, Utc};

    const T: i64 = 1_700_000_000;

    fn endpoints(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn two_feeds() -> StubFetcher {
        StubFetcher::default()
            .feed(
                "nqrw",
                &feed(vec![
                    trip_entity("A_N..S", "N", vec![stop("R09S", Some(T + 600))]),
                    vehicle_entity("A_N..S"),
                ]),
            )
            .feed(
                "1234567",
                &feed(vec![trip_entity(
                    "B_7..S",
                    "7",
                    vec![stop("718S", Some(T + 60)), stop("R09S", Some(T + 120))],
                )]),
            )
    }

    #[tokio::test]
    async fn concatenates_in_endpoint_order() {
        let merged = collect_candidates(
            &two_feeds(),
            &endpoints(&["nqrw", "1234567"]),
            &MergeOptions::default(),
        )
        .await
        .unwrap();

        let trips: Vec<_> = merged.candidates.iter().map(|c| c.trip_id.as_str()).collect();
        assert_eq!(trips, vec!["A_N..S", "B_7..S", "B_7..S"]);
        assert!(merged.failures.is_empty());
    }

    #[tokio::test]
    async fn fail_fast_names_failed_endpoint() {
        let fetcher = two_feeds().reply("l", Reply::Unauthorized);

        let err = collect_candidates(
            &fetcher,
            &endpoints(&["nqrw", "l"]),
            &MergeOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            QueryError::FetchFailed { ref endpoint, source: FetchError::Unauthorized } if endpoint == "l"
        ));
    }

    #[tokio::test]
    async fn decode_failure_is_reported() {
        let fetcher = two_feeds().reply("bad", Reply::Feed(vec![0xFF, 0xFE, 0x00, 0x01]));

        let err = collect_candidates(&fetcher, &endpoints(&["bad"]), &MergeOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::DecodeFailed { ref endpoint, .. } if endpoint == "bad"));
    }

    #[tokio::test]
    async fn partial_keeps_healthy_feeds() {
        let options = MergeOptions {
            policy: FailurePolicy::Partial,
            deadline: None,
        };

        let merged = collect_candidates(
            &two_feeds(),
            &endpoints(&["nqrw", "missing", "1234567"]),
            &options,
        )
        .await
        .unwrap();

        assert_eq!(merged.candidates.len(), 3);
        assert_eq!(merged.failures.len(), 1);
        assert_eq!(merged.failures[0].endpoint(), Some("missing"));
    }

    #[tokio::test]
    async fn deadline_discards_everything() {
        let fetcher = two_feeds().reply(
            "slow",
            Reply::Slow(Duration::from_secs(30), Vec::new()),
        );
        let options = MergeOptions {
            policy: FailurePolicy::Partial,
            deadline: Some(Duration::from_millis(50)),
        };

        let err = collect_candidates(&fetcher, &endpoints(&["nqrw", "slow"]), &options)
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::DeadlineExceeded(_)));
    }

    #[tokio::test]
    async fn no_endpoints_no_candidates() {
        let merged = collect_candidates(&two_feeds(), &[], &MergeOptions::default())
            .await
            .unwrap();
        assert!(merged.candidates.is_empty());
    }

    #[tokio::test]
    async fn merge_then_filter_equals_filter_then_concat() {
        let fetcher = two_feeds();
        let query = DepartureQuery::new(["R09S", "718S"]).direction("S");
        let options = FilterOptions {
            sort: false,
            ..Default::default()
        };
        let as_of = Utc.timestamp_opt(T, 0).unwrap();

        let merged = collect_candidates(
            &fetcher,
            &endpoints(&["nqrw", "1234567"]),
            &MergeOptions::default(),
        )
        .await
        .unwrap();
        let together = filter_departures(&merged.candidates, &query, as_of, &options, &NoLabels);

        let mut separately = Vec::new();
        for endpoint in ["nqrw", "1234567"] {
            let one = collect_candidates(&fetcher, &endpoints(&[endpoint]), &MergeOptions::default())
                .await
                .unwrap();
            separately.extend(filter_departures(&one.candidates, &query, as_of, &options, &NoLabels));
        }

        assert_eq!(together, separately);
        assert_eq!(together.len(), 3);
    }
}
