//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// Image handling (CDN addressing, cache store, HTTP retrieval).
pub mod image;

pub use config::{AppConfig, CliArgs, Command, ConfigError, LogLevel, StorageManager};
pub use image::{
    CacheStats, CacheStore, CdnConfig, HttpImageFetcher, StoreStatus, build_address,
    build_responsive_set, build_simple_address,
};
