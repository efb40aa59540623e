//! Cache-first payload retrieval.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::join_all;
use tracing::{debug, trace, warn};

use crate::domain::entities::PayloadSource;
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::{CacheStorePort, NetworkFetcherPort, WriteOutcome};

/// What happened to the cache write after a network fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheWrite {
    /// Served from cache; nothing to write.
    NotNeeded,
    /// Payload persisted.
    Stored,
    /// Store unavailable or closed; nothing persisted.
    Skipped,
    /// Write attempted and failed. The fetch still succeeded.
    Failed(CacheError),
}

/// A payload plus where it came from and how caching went.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Raw payload bytes.
    pub payload: Bytes,
    /// Cache hit or network download.
    pub source: PayloadSource,
    /// Outcome of writing the payload back to the store.
    pub cache_write: CacheWrite,
}

/// Serves payloads from the store, falling back to one network attempt.
///
/// Concurrent misses for the same address each go to the network; callers
/// that need single-flight must de-duplicate themselves.
#[derive(Clone)]
pub struct ImageFetchService {
    store: Arc<dyn CacheStorePort>,
    network: Arc<dyn NetworkFetcherPort>,
}

impl std::fmt::Debug for ImageFetchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageFetchService").finish_non_exhaustive()
    }
}

impl ImageFetchService {
    /// Creates new fetch service.
    #[must_use]
    pub const fn new(
        store: Arc<dyn CacheStorePort>,
        network: Arc<dyn NetworkFetcherPort>,
    ) -> Self {
        Self { store, network }
    }

    /// Returns the payload for `address`, from cache when possible.
    ///
    /// # Errors
    /// Returns [`CacheError::Network`] if the address is not cached and the
    /// download fails. Store failures never surface here.
    pub async fn fetch_with_cache(&self, address: &str) -> CacheResult<FetchOutcome> {
        if let Some(payload) = self.store.get(address).await {
            trace!(address = %address, size = payload.len(), "Serving image from cache");
            return Ok(FetchOutcome {
                payload,
                source: PayloadSource::Cache,
                cache_write: CacheWrite::NotNeeded,
            });
        }

        let payload = self.network.fetch(address).await.map_err(|e| {
            warn!(address = %address, error = %e, "Failed to fetch image");
            e
        })?;

        let cache_write = match self.store.set(address, payload.clone()).await {
            Ok(WriteOutcome::Stored) => CacheWrite::Stored,
            Ok(WriteOutcome::Skipped) => CacheWrite::Skipped,
            Err(e) => {
                warn!(address = %address, error = %e, "Failed to cache image, serving anyway");
                CacheWrite::Failed(e)
            }
        };

        debug!(
            address = %address,
            size = payload.len(),
            cache_write = ?cache_write,
            "Fetched image from network"
        );

        Ok(FetchOutcome {
            payload,
            source: PayloadSource::Network,
            cache_write,
        })
    }

    /// Fetches several addresses concurrently, returning per-address results
    /// in input order.
    pub async fn prefetch<'a, I>(&self, addresses: I) -> Vec<(String, CacheResult<PayloadSource>)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let tasks = addresses.into_iter().map(|address| async move {
            let result = self
                .fetch_with_cache(address)
                .await
                .map(|outcome| outcome.source);
            (address.to_string(), result)
        });
        join_all(tasks).await
    }

    /// Removes one address from the store.
    pub async fn evict(&self, address: &str) {
        self.store.delete(address).await;
    }

    /// Removes every cached payload.
    pub async fn clear(&self) {
        self.store.clear().await;
    }
}
