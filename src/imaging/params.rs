//! Parameter types for image operations.
//!
//! These structs describe *what* to produce, not *how*. They are the
//! interface between [`operations`](super::operations) (which decides which
//! files to write and what to call them) and the [`backend`](super::backend)
//! (which does the pixel work), so a mock backend can stand in for tests.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`OutputFormat`]: `jpg`, `png`, `webp` or `avif`.
//! - [`EncodeTarget`]: one output file and its format.
//! - [`RenderParams`]: one cover-cropped size, written in every target format.
//! - [`CutoutParams`]: local background removal settings.
//! - [`LogoParams`]: logo cleanup settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

/// Encoded output format of a variant file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpg,
    Png,
    Webp,
    Avif,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Jpg,
        OutputFormat::Png,
        OutputFormat::Webp,
        OutputFormat::Avif,
    ];

    /// File extension, also the name used in presets.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Avif => "avif",
        }
    }

    /// Whether the shared quality value applies.
    pub fn is_lossy(self) -> bool {
        !matches!(self, OutputFormat::Png)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            "avif" => Ok(OutputFormat::Avif),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// One file to write for a rendered size.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeTarget {
    pub path: PathBuf,
    pub format: OutputFormat,
}

/// Cover-crop the source to exactly `width`×`height` and write it once per
/// target. With `placeholder` set, also write the inline preview sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
    pub targets: Vec<EncodeTarget>,
    pub placeholder: Option<PathBuf>,
}

/// Local background removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoutParams {
    /// Largest per-channel distance from the background colour still treated
    /// as background.
    pub tolerance: u8,
    /// Flatten the cut-out onto this colour. `None` keeps transparency.
    pub matte: Option<[u8; 3]>,
}

impl CutoutParams {
    pub const WHITE: [u8; 3] = [255, 255, 255];
}

impl Default for CutoutParams {
    fn default() -> Self {
        Self {
            tolerance: 32,
            matte: None,
        }
    }
}

/// Logo cleanup: flatten onto white, upscale narrow sources, stretch levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoParams {
    pub min_width: u32,
}

impl Default for LogoParams {
    fn default() -> Self {
        Self { min_width: 1024 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn quality_deserializes_clamped() {
        let q: Quality = serde_json::from_str("250").unwrap();
        assert_eq!(q.value(), 100);
    }

    #[test]
    fn format_names_and_lossiness() {
        assert_eq!("JPEG".parse::<OutputFormat>(), Ok(OutputFormat::Jpg));
        assert_eq!(OutputFormat::Webp.extension(), "webp");
        assert!(OutputFormat::Avif.is_lossy());
        assert!(!OutputFormat::Png.is_lossy());
        assert!(OutputFormat::Webp.is_lossy());
        assert!("gif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn format_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&OutputFormat::Avif).unwrap(), "\"avif\"");
    }
}
