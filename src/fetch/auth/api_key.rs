use crate::error::ConfigError;
use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// Header the MTA developer API reads the key from.
pub const MTA_API_KEY_HEADER: &str = "x-api-key";

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// The header name and value are validated once, at construction.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self, ConfigError> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .map_err(|e| ConfigError::InvalidHeader(e.to_string()))?;
        let mut value =
            HeaderValue::from_str(key).map_err(|e| ConfigError::InvalidHeader(e.to_string()))?;
        value.set_sensitive(true);
        Ok(Self {
            inner,
            header_name,
            value,
        })
    }

    /// Sends `key` as `x-api-key`.
    pub fn mta(inner: C, key: &str) -> Result<Self, ConfigError> {
        Self::new(inner, MTA_API_KEY_HEADER, key)
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}
