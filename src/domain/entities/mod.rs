//! Domain entity definitions.

mod cached_entry;
mod image_spec;
mod responsive_image;

pub use cached_entry::{
    CachedEntry, DEFAULT_TTL_DAYS, EntryHeader, PayloadSource, default_ttl, ttl_from_days,
};
pub use image_spec::{
    ImageSpec, SizePreset, TransformKey, TransformParseError, TransformValue, Transformations,
    parse_token,
};
pub use responsive_image::{ResponsiveImage, ResponsiveVariant, srcset};
