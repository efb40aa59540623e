//! Image CDN address construction.
//!
//! Addresses follow the `image/upload` scheme:
//! `https://<host>/<cloud>/image/upload/<tokens>/<public_id>`.
//! Nothing here validates or escapes its input.

use crate::domain::entities::{
    ImageSpec, ResponsiveImage, ResponsiveVariant, SizePreset, TransformKey, TransformValue,
    Transformations,
};

/// Default CDN host.
pub const DEFAULT_HOST: &str = "res.cloudinary.com";

/// Default cloud name.
pub const DEFAULT_CLOUD_NAME: &str = "demo";

/// Widths of the responsive variant ladder, ascending.
pub const RESPONSIVE_WIDTHS: [u32; 4] = [640, 1024, 1920, 2560];

/// Width of the blurred placeholder.
pub const PLACEHOLDER_WIDTH: u32 = 40;

/// Quality of the blurred placeholder.
pub const PLACEHOLDER_QUALITY: u32 = 1;

/// Blur effect applied to the placeholder.
pub const PLACEHOLDER_BLUR: &str = "blur:1000";

/// Layout hint used when the caller gives none.
pub const DEFAULT_SIZE_HINTS: &str = "(max-width: 640px) 100vw, (max-width: 1024px) 50vw, 33vw";

/// Where addresses point and which transformations every address carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnConfig {
    /// CDN host name.
    pub host: String,
    /// Account (cloud) name.
    pub cloud_name: String,
    /// Base layer merged under every caller's transformations.
    pub default_transformations: Transformations,
}

impl CdnConfig {
    /// Returns the default transformation bundle.
    #[must_use]
    pub fn default_transformations() -> Transformations {
        Transformations::new()
            .with(TransformKey::Quality, "auto:good")
            .with(TransformKey::Format, "auto")
            .with(TransformKey::Dpr, "auto")
            .with(TransformKey::Crop, "limit")
            .with(TransformKey::Flags, "progressive")
    }

    /// Returns the address prefix all assets share.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("https://{}/{}/image/upload", self.host, self.cloud_name)
    }
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            cloud_name: DEFAULT_CLOUD_NAME.to_string(),
            default_transformations: Self::default_transformations(),
        }
    }
}

/// Builds the address of `public_id` with `transformations` over the defaults.
///
/// Overrides win key by key. Token order is the non-overridden defaults in
/// default order, then the overrides in insertion order. An empty merged
/// mapping omits the transformation segment.
#[must_use]
pub fn build_address(config: &CdnConfig, public_id: &str, transformations: &Transformations) -> String {
    let merged = config.default_transformations.merged_with(transformations);
    if merged.is_empty() {
        return format!("{}/{public_id}", config.base_url());
    }
    format!("{}/{merged}/{public_id}", config.base_url())
}

/// Builds the address of `public_id` at a preset size, without extras.
#[must_use]
pub fn build_simple_address(config: &CdnConfig, public_id: &str, size: SizePreset) -> String {
    build_address(config, public_id, &size.transformations())
}

/// Returns the placeholder bundle for the given custom transformations.
///
/// Only crop-related keys survive, so the placeholder frames the same
/// region as the full image. The width stays below `primary_width` when the
/// primary is narrower than [`PLACEHOLDER_WIDTH`], never dropping under 1.
#[must_use]
pub fn placeholder_transformations(
    custom: &Transformations,
    primary_width: Option<i64>,
) -> Transformations {
    let max_width = i64::from(PLACEHOLDER_WIDTH);
    let width = primary_width.map_or(max_width, |w| w.saturating_sub(1).clamp(1, max_width));

    custom
        .filtered(TransformKey::is_crop_related)
        .with(TransformKey::Width, width)
        .with(TransformKey::Quality, PLACEHOLDER_QUALITY)
        .with(TransformKey::Effect, PLACEHOLDER_BLUR)
}

/// Derives the primary address, width variants and placeholder for `spec`.
#[must_use]
pub fn build_responsive_set(
    config: &CdnConfig,
    spec: &ImageSpec,
    size_hints: Option<&str>,
) -> ResponsiveImage {
    let primary_bundle = spec.size.transformations().merged_with(&spec.transformations);
    let primary = build_address(config, &spec.public_id, &primary_bundle);

    let variants = RESPONSIVE_WIDTHS
        .iter()
        .map(|&width| {
            let mut bundle = spec.transformations.clone();
            bundle.remove(TransformKey::Width);
            let bundle = bundle.with(TransformKey::Width, width);
            ResponsiveVariant {
                width,
                address: build_address(config, &spec.public_id, &bundle),
            }
        })
        .collect();

    let primary_width = primary_bundle
        .get(TransformKey::Width)
        .and_then(TransformValue::as_number);
    let placeholder = build_address(
        config,
        &spec.public_id,
        &placeholder_transformations(&spec.transformations, primary_width),
    );

    ResponsiveImage {
        primary,
        variants,
        placeholder,
        size_hints: size_hints.unwrap_or(DEFAULT_SIZE_HINTS).to_string(),
    }
}
