//! HTTP retrieval of image payloads.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::NetworkFetcherPort;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("folio-media/", env!("CARGO_PKG_VERSION"));

/// Downloads payloads with a single GET per call.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    /// Creates a fetcher with the given timeout and user agent.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(timeout: Duration, user_agent: &str) -> CacheResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| CacheError::network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Creates a fetcher with default settings.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn with_defaults() -> CacheResult<Self> {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS), DEFAULT_USER_AGENT)
    }
}

#[async_trait]
impl NetworkFetcherPort for HttpImageFetcher {
    async fn fetch(&self, address: &str) -> CacheResult<Bytes> {
        debug!(address = %address, "Downloading image from network");

        let response = self
            .client
            .get(address)
            .send()
            .await
            .map_err(|e| CacheError::network(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::http_status(
                status.as_u16(),
                format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            ));
        }

        response
            .bytes()
            .await
            .map_err(|e| CacheError::network(format!("Failed to read body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_creation() {
        assert!(HttpImageFetcher::with_defaults().is_ok());
    }

    #[tokio::test]
    async fn test_invalid_address_is_network_error() {
        let fetcher = HttpImageFetcher::with_defaults().unwrap();

        let result = fetcher.fetch("not a url").await;

        let err = result.unwrap_err();
        assert!(err.is_network_error());
        assert_eq!(err.status(), None);
    }
}
