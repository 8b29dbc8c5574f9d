//! Shared types used across the pipeline stages.
//!
//! [`Container`] names the page slots assets are bound to, and [`ImageSize`]
//! is the small set of canvas sizes the image provider accepts. Both are
//! serialized as plain lowercase strings so manifests and the content
//! database stay readable by the downstream site build.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Logical placement slot on a page.
///
/// Each container has its own cardinality: `hero` and `product` hold a single
/// asset, `slider` holds an ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Hero,
    Slider,
    Product,
}

impl Container {
    pub const ALL: [Container; 3] = [Container::Hero, Container::Slider, Container::Product];

    pub fn as_str(self) -> &'static str {
        match self {
            Container::Hero => "hero",
            Container::Slider => "slider",
            Container::Product => "product",
        }
    }

    /// Map a preset name to the container it produces assets for.
    ///
    /// `hero_*` → hero, `slider_*` → slider, `product_*` → product.
    /// Anything else (including the bare prefix without underscore) maps to
    /// no container.
    pub fn from_preset(preset: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| preset.strip_prefix(c.as_str()).is_some_and(|rest| rest.starts_with('_')))
    }

    /// Whether the slot holds a list of items rather than a single one.
    pub fn is_list(self) -> bool {
        matches!(self, Container::Slider)
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown container '{0}' (expected hero, slider or product)")]
pub struct UnknownContainer(pub String);

impl FromStr for Container {
    type Err = UnknownContainer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownContainer(s.to_string()))
    }
}

/// Canvas sizes accepted by the image provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageSize {
    #[default]
    Square,
    Portrait,
    Landscape,
    Auto,
}

impl ImageSize {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::Square => "1024x1024",
            ImageSize::Portrait => "1024x1536",
            ImageSize::Landscape => "1536x1024",
            ImageSize::Auto => "auto",
        }
    }

    /// Map arbitrary size input onto a supported size.
    ///
    /// Exact matches (case-insensitive) are kept. Any `WxH` pair found in the
    /// input is classified by comparing width and height: wider → landscape,
    /// taller → portrait, equal → square. Empty or unrecognized input falls
    /// back to square.
    ///
    /// Equal sides map to square, not landscape: a `1200x1200` request
    /// means a square canvas, and only `w > h` is treated as wide.
    pub fn normalize(input: &str) -> Self {
        let s = input.trim().to_ascii_lowercase();
        match s.as_str() {
            "1024x1024" => return ImageSize::Square,
            "1024x1536" => return ImageSize::Portrait,
            "1536x1024" => return ImageSize::Landscape,
            "auto" => return ImageSize::Auto,
            _ => {}
        }
        match parse_dimensions(&s) {
            Some((w, h)) if w > h => ImageSize::Landscape,
            Some((w, h)) if w < h => ImageSize::Portrait,
            _ => ImageSize::Square,
        }
    }
}

/// Find the first `<digits> x <digits>` pair in a string.
fn parse_dimensions(s: &str) -> Option<(u64, u64)> {
    for (pos, _) in s.match_indices('x') {
        let left = s[..pos].trim_end();
        let right = s[pos + 1..].trim_start();

        let w_digits: String = left
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        let h_digits: String = right.chars().take_while(|c| c.is_ascii_digit()).collect();

        if let (Ok(w), Ok(h)) = (w_digits.parse(), h_digits.parse()) {
            return Some((w, h));
        }
    }
    None
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ImageSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ImageSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ImageSize::normalize(&raw))
    }
}
