pub mod cached_image;
pub mod display_handle;
pub mod image_fetch_service;

pub use cached_image::{
    AbortController, AbortSignal, CachedImage, ImageRequest, ImageState, LoadStatus,
};
pub use display_handle::{DisplayHandle, HandleRegistry};
pub use image_fetch_service::{CacheWrite, FetchOutcome, ImageFetchService};
