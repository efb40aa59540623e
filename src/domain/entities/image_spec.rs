//! Transformation vocabulary and logical image specifications.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing transformation tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum TransformParseError {
    #[error("unknown transformation key: {key}")]
    UnknownKey { key: String },

    #[error("malformed transformation token {token:?}, expected key_value")]
    MalformedToken { token: String },
}

/// Transformation parameter names understood by the image CDN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKey {
    /// `q`: quality.
    Quality,
    /// `f`: output format.
    Format,
    /// `dpr`: device pixel ratio.
    Dpr,
    /// `c`: crop mode.
    Crop,
    /// `fl`: flags.
    Flags,
    /// `w`: width.
    Width,
    /// `h`: height.
    Height,
    /// `g`: gravity.
    Gravity,
    /// `x`: horizontal offset.
    X,
    /// `y`: vertical offset.
    Y,
    /// `ar`: aspect ratio.
    AspectRatio,
    /// `e`: effect.
    Effect,
}

impl TransformKey {
    /// All keys, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Quality,
        Self::Format,
        Self::Dpr,
        Self::Crop,
        Self::Flags,
        Self::Width,
        Self::Height,
        Self::Gravity,
        Self::X,
        Self::Y,
        Self::AspectRatio,
        Self::Effect,
    ];

    /// Returns the wire name of the key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "q",
            Self::Format => "f",
            Self::Dpr => "dpr",
            Self::Crop => "c",
            Self::Flags => "fl",
            Self::Width => "w",
            Self::Height => "h",
            Self::Gravity => "g",
            Self::X => "x",
            Self::Y => "y",
            Self::AspectRatio => "ar",
            Self::Effect => "e",
        }
    }

    /// Returns true for keys that decide which region of the source is framed.
    #[must_use]
    pub const fn is_crop_related(self) -> bool {
        matches!(
            self,
            Self::Crop | Self::X | Self::Y | Self::Gravity | Self::AspectRatio
        )
    }
}

impl fmt::Display for TransformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformKey {
    type Err = TransformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| TransformParseError::UnknownKey { key: s.to_string() })
    }
}

/// Value of a transformation parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformValue {
    /// Free-form text such as `auto:good` or `blur:1000`.
    Text(String),
    /// Integer value such as a width in pixels.
    Number(i64),
}

impl TransformValue {
    /// Returns the numeric value, if this is a number.
    #[must_use]
    pub const fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for TransformValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for TransformValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for TransformValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<u32> for TransformValue {
    fn from(n: u32) -> Self {
        Self::Number(i64::from(n))
    }
}

impl From<i64> for TransformValue {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

/// Parses a single `key_value` token.
///
/// The value is everything after the first underscore, so `g_north_east`
/// yields gravity `north_east`. Values written in canonical integer form
/// become [`TransformValue::Number`]; anything else (`0300`, `+5`) is kept
/// verbatim as text.
///
/// # Errors
/// Returns an error if the token has no underscore or the key is unknown.
pub fn parse_token(token: &str) -> Result<(TransformKey, TransformValue), TransformParseError> {
    let (key, value) = token
        .trim()
        .split_once('_')
        .ok_or_else(|| TransformParseError::MalformedToken {
            token: token.to_string(),
        })?;

    let key = key.parse::<TransformKey>()?;
    let value = match value.parse::<i64>() {
        Ok(n) if n.to_string() == value => TransformValue::Number(n),
        _ => TransformValue::Text(value.to_string()),
    };

    Ok((key, value))
}

/// Insertion-ordered mapping from transformation key to value.
///
/// Each key appears at most once. [`Transformations::insert`] replaces an
/// existing value in place; [`Transformations::merged_with`] moves overridden
/// keys to the end. Keys are never sorted, so two mappings built in a
/// different order serialize to different (but equally valid) token strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transformations {
    entries: Vec<(TransformKey, TransformValue)>,
}

impl Transformations {
    /// Creates an empty mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: TransformKey, value: impl Into<TransformValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a value, returning the previous one if the key was present.
    pub fn insert(
        &mut self,
        key: TransformKey,
        value: impl Into<TransformValue>,
    ) -> Option<TransformValue> {
        let value = value.into();
        if let Some((_, existing)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(existing, value));
        }
        self.entries.push((key, value));
        None
    }

    /// Returns the value for a key.
    #[must_use]
    pub fn get(&self, key: TransformKey) -> Option<&TransformValue> {
        self.entries
            .iter()
            .find_map(|(k, v)| (*k == key).then_some(v))
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains_key(&self, key: TransformKey) -> bool {
        self.get(key).is_some()
    }

    /// Removes a key, returning its value.
    pub fn remove(&mut self, key: TransformKey) -> Option<TransformValue> {
        let idx = self.entries.iter().position(|(k, _)| *k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (TransformKey, &TransformValue)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Layers `overrides` on top of `self`.
    ///
    /// The result holds the keys of `self` that `overrides` does not touch, in
    /// their original order, followed by every entry of `overrides` in its
    /// own order.
    #[must_use]
    pub fn merged_with(&self, overrides: &Self) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(k, _)| !overrides.contains_key(*k))
            .chain(overrides.entries.iter())
            .cloned()
            .collect();
        Self { entries }
    }

    /// Keeps only the entries whose key satisfies `predicate`.
    #[must_use]
    pub fn filtered(&self, predicate: impl Fn(TransformKey) -> bool) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(k, _)| predicate(*k))
            .cloned()
            .collect();
        Self { entries }
    }

    /// Serializes entries as `key_value` tokens.
    #[must_use]
    pub fn to_tokens(&self) -> Vec<String> {
        self.entries.iter().map(|(k, v)| format!("{k}_{v}")).collect()
    }
}

impl fmt::Display for Transformations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_tokens().join(","))
    }
}

impl FromStr for Transformations {
    type Err = TransformParseError;

    /// Parses a comma-separated token list such as `w_300,c_fill`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .filter(|token| !token.trim().is_empty())
            .map(parse_token)
            .collect()
    }
}

impl FromIterator<(TransformKey, TransformValue)> for Transformations {
    fn from_iter<I: IntoIterator<Item = (TransformKey, TransformValue)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (key, value) in iter {
            out.insert(key, value);
        }
        out
    }
}

/// Preset size classes, each mapping to a transformation bundle.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SizePreset {
    /// Square 200px crop focused automatically.
    Thumbnail,
    /// 400px wide.
    Small,
    /// 800px wide.
    #[default]
    Medium,
    /// 1280px wide.
    Large,
    /// 1920px wide.
    Full,
}

impl SizePreset {
    /// Returns the nominal width of the preset in pixels.
    #[must_use]
    pub const fn width(self) -> u32 {
        match self {
            Self::Thumbnail => 200,
            Self::Small => 400,
            Self::Medium => 800,
            Self::Large => 1280,
            Self::Full => 1920,
        }
    }

    /// Returns the transformation bundle for this preset.
    #[must_use]
    pub fn transformations(self) -> Transformations {
        let bundle = Transformations::new().with(TransformKey::Width, self.width());
        match self {
            Self::Thumbnail => bundle
                .with(TransformKey::Height, self.width())
                .with(TransformKey::Crop, "fill")
                .with(TransformKey::Gravity, "auto"),
            Self::Small | Self::Medium | Self::Large | Self::Full => bundle,
        }
    }
}

impl fmt::Display for SizePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thumbnail => write!(f, "thumbnail"),
            Self::Small => write!(f, "small"),
            Self::Medium => write!(f, "medium"),
            Self::Large => write!(f, "large"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// A logical image request: which asset, at which size, with which extras.
///
/// Built per request and thrown away; only the addresses derived from it are
/// cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    /// Opaque identifier of the source asset.
    pub public_id: String,
    /// Size class of the primary address.
    pub size: SizePreset,
    /// Caller transformations, layered over the preset.
    pub transformations: Transformations,
}

impl ImageSpec {
    /// Creates a spec with the default size and no extra transformations.
    #[must_use]
    pub fn new(public_id: impl Into<String>) -> Self {
        Self {
            public_id: public_id.into(),
            size: SizePreset::default(),
            transformations: Transformations::new(),
        }
    }

    /// Sets the size preset.
    #[must_use]
    pub const fn with_size(mut self, size: SizePreset) -> Self {
        self.size = size;
        self
    }

    /// Sets the custom transformations.
    #[must_use]
    pub fn with_transformations(mut self, transformations: Transformations) -> Self {
        self.transformations = transformations;
        self
    }
}
