//! Centralized file and key naming.
//!
//! Every file the pipeline writes is named here so the encoder, the
//! generation workflow and the edit workflow agree on one convention:
//!
//! ```text
//! hero_main-sunlit-shop-counter-2026-03-01T10-15-00-000Z-01-1920x1080.jpg
//! └─ preset ─┘└── prompt slug ──┘└──── run stamp ─────┘└#┘└── size ──┘└ext┘
//! ```
//!
//! Variant names are a pure function of `(base, width, height, format)`, which
//! is what makes repeated encodes of the same base name land on the same paths.

use chrono::{DateTime, SecondsFormat, Utc};

/// Longest slug kept by [`slug`].
const SLUG_MAX: usize = 80;

/// Longest prompt slug embedded in a file stem.
const STEM_SLUG_MAX: usize = 40;

/// Extension appended to a variant path for its placeholder sidecar.
pub const PLACEHOLDER_SUFFIX: &str = "lqip.txt";

/// Lowercase, collapse every run of non `[a-z0-9]` characters to a single
/// dash, trim dashes at both ends, and cap at 80 characters.
///
/// - `"Sunlit Shop Counter!"` → `"sunlit-shop-counter"`
/// - `"  --Glass & Steel--  "` → `"glass-steel"`
pub fn slug(input: &str) -> String {
    let lowered = input.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_dash = false;
    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out.truncate(SLUG_MAX);
    out
}

/// Filesystem-safe timestamp: RFC 3339 with `:` and `.` replaced by `-`.
pub fn stamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// File stem shared by every variant of one produced image.
///
/// `{prefix}-{slug(text) capped at 40}-{stamp}`
pub fn file_stem(text: &str, prefix: &str, now: DateTime<Utc>) -> String {
    let mut s = slug(text);
    s.truncate(STEM_SLUG_MAX);
    let s = s.trim_end_matches('-');
    format!("{}-{}-{}", prefix, s, stamp(now))
}

/// Stem for the `index`-th (1-based) buffer of a batch: `{stem}-{index:02}`.
pub fn batch_stem(stem: &str, index: usize) -> String {
    format!("{}-{:02}", stem, index)
}

/// Variant file name: `{base}-{width}x{height}.{ext}`.
pub fn variant_file_name(base: &str, width: u32, height: u32, ext: &str) -> String {
    format!("{}-{}x{}.{}", base, width, height, ext)
}

/// Placeholder sidecar name for a variant file name.
pub fn placeholder_file_name(variant_file_name: &str) -> String {
    format!("{}.{}", variant_file_name, PLACEHOLDER_SUFFIX)
}

/// Serde adapter writing timestamps as `2026-03-01T10:15:00.000Z`: RFC 3339,
/// UTC, always with milliseconds. Reading accepts any RFC 3339 form.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(deserializer)
    }
}

/// Content database page key: the page path with one trailing slash removed.
///
/// - `"/shop/"` → `"/shop"`
/// - `"/shop//"` → `"/shop/"`
/// - `"/"` → `""`
pub fn page_key(page: &str) -> &str {
    page.strip_suffix('/').unwrap_or(page)
}

/// Last non-empty `/` segment of a page path, used for topic lookup.
pub fn page_slug(page: &str) -> Option<&str> {
    page.split('/').filter(|s| !s.is_empty()).next_back()
}
