//! Application layer: cache-first retrieval and image consumers.

/// Orchestration services.
pub mod services;

pub use services::{
    AbortController, AbortSignal, CacheWrite, CachedImage, DisplayHandle, FetchOutcome,
    HandleRegistry, ImageFetchService, ImageRequest, ImageState, LoadStatus,
};
