mod client;
mod basic;
mod source;
pub mod auth;

pub use client::HttpClient;
pub use basic::BasicClient;
pub use source::{FeedFetcher, SourceFetcher};

use bytes::Bytes;
use tracing::debug;

use crate::error::FetchError;

/// GETs `url` through `client` and returns the response body.
///
/// Non-success statuses are classified by [`FetchError::from_status`].
pub async fn fetch_bytes<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
) -> Result<Bytes, FetchError> {
    let parsed = url
        .parse::<reqwest::Url>()
        .map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        debug!(status = status.as_u16(), "Feed request rejected");
        return Err(FetchError::from_status(status.as_u16()));
    }
    Ok(resp.bytes().await?)
}
