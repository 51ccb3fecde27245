//! Error types surfaced by the departure pipeline.

use std::time::Duration;

use thiserror::Error;

/// Failure retrieving the raw bytes of one feed endpoint.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request rejected: missing or invalid API key")]
    Unauthorized,
    #[error("feed not found")]
    NotFound,
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Classifies a non-success HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => FetchError::Unauthorized,
            404 => FetchError::NotFound,
            other => FetchError::Status(other),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(err)
        }
    }
}

/// Failure of a whole departure query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("could not retrieve feed {endpoint}: {source}")]
    FetchFailed {
        endpoint: String,
        #[source]
        source: FetchError,
    },
    #[error("could not decode feed {endpoint}: {source}")]
    DecodeFailed {
        endpoint: String,
        #[source]
        source: prost::DecodeError,
    },
    #[error("feeds did not arrive within {0:?}")]
    DeadlineExceeded(Duration),
}

impl QueryError {
    /// The endpoint that failed, if the failure belongs to a single endpoint.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            QueryError::FetchFailed { endpoint, .. } | QueryError::DecodeFailed { endpoint, .. } => {
                Some(endpoint)
            }
            QueryError::DeadlineExceeded(_) => None,
        }
    }
}

/// Failure loading configuration or static lookup tables.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("unknown time zone '{0}'")]
    UnknownTimeZone(String),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("unknown feed group '{0}'")]
    UnknownFeedGroup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failed_names_endpoint() {
        let err = QueryError::FetchFailed {
            endpoint: "https://example.com/nqrw".into(),
            source: FetchError::Unauthorized,
        };
        assert_eq!(err.endpoint(), Some("https://example.com/nqrw"));
        assert_eq!(
            err.to_string(),
            "could not retrieve feed https://example.com/nqrw: request rejected: missing or invalid API key"
        );
    }

    #[test]
    fn decode_failed_names_endpoint() {
        let bad_bytes: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
        let decode_err =
            <crate::gtfs_rt::FeedMessage as prost::Message>::decode(bad_bytes).unwrap_err();
        let err = QueryError::DecodeFailed {
            endpoint: "feeds/nqrw.pb".into(),
            source: decode_err,
        };
        assert_eq!(err.endpoint(), Some("feeds/nqrw.pb"));
        assert!(err.to_string().starts_with("could not decode feed feeds/nqrw.pb"));
    }

    #[test]
    fn deadline_has_no_endpoint() {
        let err = QueryError::DeadlineExceeded(Duration::from_secs(5));
        assert_eq!(err.endpoint(), None);
        assert_eq!(err.to_string(), "feeds did not arrive within 5s");
    }

    #[test]
    fn fetch_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FetchError = io_err.into();
        assert!(matches!(err, FetchError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn fetch_error_from_status() {
        assert!(matches!(FetchError::from_status(401), FetchError::Unauthorized));
        assert!(matches!(FetchError::from_status(403), FetchError::Unauthorized));
        assert!(matches!(FetchError::from_status(404), FetchError::NotFound));
        assert!(matches!(FetchError::from_status(503), FetchError::Status(503)));
    }

    #[test]
    fn config_error_unknown_zone() {
        let err = ConfigError::UnknownTimeZone("Mars/Olympus".into());
        assert_eq!(err.to_string(), "unknown time zone 'Mars/Olympus'");
    }
}
