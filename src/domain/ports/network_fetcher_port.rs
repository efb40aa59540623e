//! Port definition for retrieving image payloads over the network.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::errors::CacheResult;

/// Port for a single network retrieval of an address.
#[async_trait]
pub trait NetworkFetcherPort: Send + Sync {
    /// Downloads the payload at `address`.
    ///
    /// Fails with [`crate::domain::errors::CacheError::Network`] on transport
    /// failure or a non-success status. No retries.
    async fn fetch(&self, address: &str) -> CacheResult<Bytes>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use crate::domain::errors::CacheError;

    /// Scripted fetcher that counts calls.
    #[derive(Default)]
    pub struct MockNetworkFetcher {
        responses: Mutex<HashMap<String, CacheResult<Bytes>>>,
        calls: AtomicUsize,
    }

    impl MockNetworkFetcher {
        /// Creates fetcher where every address returns 404.
        pub fn new() -> Self {
            Self::default()
        }

        /// Scripts a successful response.
        pub fn with_payload(self, address: &str, payload: &'static [u8]) -> Self {
            self.responses
                .lock()
                .insert(address.to_string(), Ok(Bytes::from_static(payload)));
            self
        }

        /// Scripts a failed response.
        pub fn with_failure(self, address: &str, error: CacheError) -> Self {
            self.responses
                .lock()
                .insert(address.to_string(), Err(error));
            self
        }

        /// Number of fetch calls so far.
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NetworkFetcherPort for MockNetworkFetcher {
        async fn fetch(&self, address: &str) -> CacheResult<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .get(address)
                .cloned()
                .unwrap_or_else(|| Err(CacheError::http_status(404, "HTTP 404 Not Found")))
        }
    }
}
