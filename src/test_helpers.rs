//! Shared test utilities for the pixpress test suite.
//!
//! Provides manifest entry builders, small encoded images, and the preset and
//! prompt-rule documents the unit tests parse.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let manifest = vec![
//!     entry("slider_x", "a.jpg"),
//!     entry_for("hero_a", "h.jpg", "/shop", "hero"),
//!     entry_without_files("slider_x"),
//! ];
//! let catalog = PresetCatalog::from_json_str(PRESETS_JSON, Path::new("presets.json")).unwrap();
//! ```

use chrono::{DateTime, TimeZone, Utc};
use image::codecs::png::PngEncoder;
use image::{DynamicImage, Rgba, RgbaImage};

use crate::manifest::ManifestEntry;

// =========================================================================
// Time
// =========================================================================

/// The instant every test run pretends it is.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 10, 15, 0).unwrap()
}

// =========================================================================
// Manifest entries
// =========================================================================

/// Entry with one file and no page/container metadata.
pub fn entry(preset: &str, file: &str) -> ManifestEntry {
    ManifestEntry {
        preset: preset.to_string(),
        prompt: format!("prompt for {file}"),
        files: vec![file.to_string()],
        created_at: fixed_now(),
        page: None,
        container: None,
        alt: Some(format!("alt for {file}")),
        description: None,
        keywords: Vec::new(),
    }
}

/// Entry recorded for an explicit page and container.
pub fn entry_for(preset: &str, file: &str, page: &str, container: &str) -> ManifestEntry {
    ManifestEntry {
        page: Some(page.to_string()),
        container: Some(container.to_string()),
        ..entry(preset, file)
    }
}

/// Entry whose file list is empty.
pub fn entry_without_files(preset: &str) -> ManifestEntry {
    ManifestEntry {
        files: Vec::new(),
        ..entry(preset, "none")
    }
}

// =========================================================================
// Images
// =========================================================================

fn encode_png(img: RgbaImage) -> Vec<u8> {
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_with_encoder(PngEncoder::new(&mut out))
        .unwrap();
    out
}

/// Opaque gradient PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
            255,
        ])
    });
    encode_png(img)
}

/// 64×64 product shot: near-white background with a dark 24×24 square in
/// the middle.
pub fn product_png_bytes() -> Vec<u8> {
    let img = RgbaImage::from_fn(64, 64, |x, y| {
        if (20..44).contains(&x) && (20..44).contains(&y) {
            Rgba([40, 40, 40, 255])
        } else {
            Rgba([245, 245, 245, 255])
        }
    });
    encode_png(img)
}

// =========================================================================
// Documents
// =========================================================================

/// Three valid presets: a landscape hero, a batched slider with defaults, and
/// the product edit profile.
pub const PRESETS_JSON: &str = r#"{
  "hero_main": {
    "style": { "base": "editorial photo, soft daylight", "negative": "text, watermark" },
    "options": { "size": "1536x1024" },
    "sizes": [[1920, 1080], [960, 540]],
    "formats": ["jpg", "webp"],
    "quality": 85,
    "output_subdir": "hero"
  },
  "slider_emotion": {
    "style": { "base": "warm film look" },
    "options": { "count": 3 },
    "sizes": [[1600, 900]],
    "formats": ["jpg"]
  },
  "product_edit": {
    "style": { "base": "clean studio packshot", "negative": "props" },
    "sizes": [[1200, 1200], [800, 800]],
    "formats": ["jpg", "webp", "png"],
    "quality": 92,
    "output_subdir": "product"
  }
}"#;

pub const PROMPT_RULES_JSON: &str = r#"{
  "negatives": "text, logos",
  "topics": {
    "bongs": {
      "subject": "glass water pipes",
      "materials": "borosilicate glass",
      "details": "studio reflections"
    }
  },
  "containers": {
    "hero": { "style": "wide editorial banner", "avoid": "clutter" },
    "slider": { "style": "lifestyle scene" }
  }
}"#;
