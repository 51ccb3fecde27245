use std::io::Read;

use async_trait::async_trait;
use bytes::Bytes;
use flate2::read::GzDecoder;
use tracing::debug;

use super::client::HttpClient;
use super::fetch_bytes;
use crate::error::FetchError;

/// Retrieves the raw bytes of one feed endpoint.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, endpoint: &str) -> Result<Bytes, FetchError>;
}

/// Fetches `http(s)://` endpoints through an [`HttpClient`] and reads anything
/// else from the local filesystem. Files ending in `.gz` are decompressed.
pub struct SourceFetcher<C> {
    client: C,
}

impl<C: HttpClient> SourceFetcher<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: HttpClient> FeedFetcher for SourceFetcher<C> {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, endpoint: &str) -> Result<Bytes, FetchError> {
        let bytes = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            fetch_bytes(&self.client, endpoint).await?
        } else {
            read_file(endpoint).await?
        };
        debug!(bytes = bytes.len(), "Feed bytes received");
        Ok(bytes)
    }
}

async fn read_file(path: &str) -> Result<Bytes, FetchError> {
    let raw = tokio::fs::read(path).await?;
    if !path.ends_with(".gz") {
        return Ok(Bytes::from(raw));
    }
    let mut decoded = Vec::with_capacity(raw.len() * 4);
    GzDecoder::new(raw.as_slice()).read_to_end(&mut decoded)?;
    Ok(Bytes::from(decoded))
}
