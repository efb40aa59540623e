//! The family of addresses derived from one image specification.

use serde::Serialize;

/// One entry of the responsive ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponsiveVariant {
    /// Target width in pixels.
    pub width: u32,
    /// Address of this variant.
    pub address: String,
}

/// The family of addresses derived from one [`super::ImageSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponsiveImage {
    /// Address at the requested size preset.
    pub primary: String,
    /// Width-ladder variants, ascending.
    pub variants: Vec<ResponsiveVariant>,
    /// Tiny blurred address shown while the primary loads.
    pub placeholder: String,
    /// Layout hint paired with the variants.
    pub size_hints: String,
}

impl ResponsiveImage {
    /// Renders the variants as a width-descriptor list (`<addr> 640w, ...`).
    #[must_use]
    pub fn srcset(&self) -> String {
        srcset(&self.variants)
    }

    /// Iterates every address in the set: primary, variants, then placeholder.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str())
            .chain(self.variants.iter().map(|v| v.address.as_str()))
            .chain(std::iter::once(self.placeholder.as_str()))
    }
}

/// Renders variants as a width-descriptor list.
#[must_use]
pub fn srcset(variants: &[ResponsiveVariant]) -> String {
    variants
        .iter()
        .map(|v| format!("{} {}w", v.address, v.width))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srcset_joins_width_descriptors() {
        let variants = vec![
            ResponsiveVariant {
                width: 640,
                address: "https://cdn/a".to_string(),
            },
            ResponsiveVariant {
                width: 1024,
                address: "https://cdn/b".to_string(),
            },
        ];

        assert_eq!(srcset(&variants), "https://cdn/a 640w, https://cdn/b 1024w");
        assert_eq!(srcset(&[]), "");
    }
}
