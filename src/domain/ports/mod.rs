mod cache_store_port;
mod network_fetcher_port;

pub use cache_store_port::{CacheStorePort, WriteOutcome};
pub use network_fetcher_port::NetworkFetcherPort;

#[cfg(test)]
pub use cache_store_port::MockCacheStorePort;
