//! Image handling infrastructure.
//!
//! This module provides:
//! - CDN address construction with responsive variants
//! - A persistent, TTL-bound payload store
//! - HTTP payload retrieval

pub mod cdn;
pub mod fetcher;
pub mod store;

pub use cdn::{
    CdnConfig, build_address, build_responsive_set, build_simple_address,
    placeholder_transformations,
};
pub use fetcher::HttpImageFetcher;
pub use store::{CacheStats, CacheStore, StoreStatus};
