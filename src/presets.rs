//! Preset catalogue.
//!
//! A preset bundles everything one generation run needs besides the prompt:
//! style text appended to the prompt, provider size and count, the encode
//! profile and the output subdirectory. Presets live in a JSON file keyed by
//! name (by default `config/presets.json`):
//!
//! ```json
//! {
//!   "hero_main": {
//!     "style": { "base": "editorial photo, soft daylight", "negative": "text, watermark" },
//!     "options": { "size": "1536x1024", "count": 1 },
//!     "sizes": [[1920, 1080], [1280, 720]],
//!     "formats": ["jpg", "webp", "avif"],
//!     "quality": 85,
//!     "output_subdir": "hero"
//!   }
//! }
//! ```
//!
//! The preset name prefix (`hero_`, `slider_`, `product_`) decides which
//! container the linker binds its output to.

use crate::config::ConfigError;
use crate::imaging::{EncodeConfig, OutputFormat, Quality};
use crate::schema::{self, Violations};
use crate::types::ImageSize;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Subdirectory used when a preset names none.
pub const DEFAULT_OUTPUT_SUBDIR: &str = "misc";

/// Largest batch a preset may request.
pub const MAX_COUNT: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresetStyle {
    pub base: String,
    #[serde(default)]
    pub negative: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresetOptions {
    pub size: Option<ImageSize>,
    pub count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Preset {
    pub style: PresetStyle,
    #[serde(default)]
    pub options: PresetOptions,
    pub sizes: Vec<(u32, u32)>,
    pub formats: Vec<OutputFormat>,
    #[serde(default)]
    pub quality: Quality,
    #[serde(default)]
    pub output_subdir: Option<String>,
}

impl Preset {
    /// Provider canvas size; square when the preset names none.
    pub fn size(&self) -> ImageSize {
        self.options.size.unwrap_or_default()
    }

    /// Number of images to request: `explicit`, else the preset count, else 1.
    pub fn count(&self, explicit: Option<u32>) -> u32 {
        explicit.or(self.options.count).unwrap_or(1)
    }

    /// `{prompt}. Style: {base}. Avoid: {negative}.` The avoid clause is
    /// left out when the preset has no negative text.
    pub fn final_prompt(&self, prompt: &str) -> String {
        let mut text = format!("{}. Style: {}.", prompt, self.style.base);
        if !self.style.negative.trim().is_empty() {
            text.push_str(&format!(" Avoid: {}.", self.style.negative));
        }
        text
    }

    pub fn output_dir(&self, output_root: &Path) -> PathBuf {
        output_root.join(
            self.output_subdir
                .as_deref()
                .unwrap_or(DEFAULT_OUTPUT_SUBDIR),
        )
    }

    /// Encode profile for this preset, placeholders enabled.
    pub fn encode_config(&self) -> EncodeConfig {
        EncodeConfig {
            sizes: self.sizes.clone(),
            formats: self.formats.clone(),
            quality: self.quality,
            placeholder: true,
        }
    }
}

/// All presets by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetCatalog {
    pub presets: BTreeMap<String, Preset>,
}

impl PresetCatalog {
    /// Read, validate and parse a presets file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text, path)
    }

    /// Validate and parse presets JSON. `file` labels errors.
    pub fn from_json_str(text: &str, file: &Path) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text).map_err(|source| ConfigError::Json {
            path: file.to_path_buf(),
            source,
        })?;
        let mut violations = Violations::new();
        check_presets(&value, &mut violations);
        violations.into_result(file)?;

        serde_json::from_value(value).map_err(|source| ConfigError::Json {
            path: file.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, name: &str) -> Result<&Preset, ConfigError> {
        self.presets
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPreset {
                name: name.to_string(),
                available: self.names().map(str::to_string).collect(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

fn check_presets(root: &Value, v: &mut Violations) {
    let Some(presets) = v.object(root, "") else {
        return;
    };
    if presets.is_empty() {
        v.push("", "must define at least one preset");
    }
    for (name, preset) in presets {
        check_preset(preset, name, v);
    }
}

fn check_preset(value: &Value, path: &str, v: &mut Violations) {
    let Some(preset) = v.object(value, path) else {
        return;
    };
    v.known_keys(
        preset,
        &["style", "options", "sizes", "formats", "quality", "output_subdir"],
        path,
    );

    if let Some(style) = v.required(preset, "style", path) {
        let style_path = schema::field(path, "style");
        if let Some(style) = v.object(style, &style_path) {
            v.known_keys(style, &["base", "negative"], &style_path);
            if let Some(base) = v.required(style, "base", &style_path) {
                v.non_empty_string(base, &schema::field(&style_path, "base"));
            }
            if let Some(negative) = style.get("negative") {
                v.string(negative, &schema::field(&style_path, "negative"));
            }
        }
    }

    if let Some(options) = preset.get("options") {
        let opt_path = schema::field(path, "options");
        if let Some(options) = v.object(options, &opt_path) {
            v.known_keys(options, &["size", "count"], &opt_path);
            if let Some(size) = options.get("size") {
                v.string(size, &schema::field(&opt_path, "size"));
            }
            if let Some(count) = options.get("count") {
                v.integer_in(count, &schema::field(&opt_path, "count"), 1..=MAX_COUNT);
            }
        }
    }

    if let Some(sizes) = v.required(preset, "sizes", path) {
        let sizes_path = schema::field(path, "sizes");
        for (i, size) in v.list(sizes, &sizes_path).into_iter().flatten().enumerate() {
            check_dimensions(size, &schema::item(&sizes_path, i), v);
        }
    }

    if let Some(formats) = v.required(preset, "formats", path) {
        let formats_path = schema::field(path, "formats");
        for (i, format) in v.list(formats, &formats_path).into_iter().flatten().enumerate() {
            let item_path = schema::item(&formats_path, i);
            if let Some(name) = v.string(format, &item_path) {
                if !OutputFormat::ALL.iter().any(|f| f.extension() == name) {
                    v.push(&item_path, format_args!("unknown format '{name}' (expected jpg, png, webp or avif)"));
                }
            }
        }
    }

    if let Some(quality) = preset.get("quality") {
        v.integer_in(quality, &schema::field(path, "quality"), 1..=100);
    }

    if let Some(subdir) = preset.get("output_subdir") {
        let sub_path = schema::field(path, "output_subdir");
        if let Some(sub) = v.non_empty_string(subdir, &sub_path) {
            if !is_contained_relative(sub) {
                v.push(&sub_path, "must be a relative path inside the output root");
            }
        }
    }
}

fn check_dimensions(value: &Value, path: &str, v: &mut Violations) {
    let Some(pair) = v.array(value, path) else {
        return;
    };
    if pair.len() != 2 {
        v.push(path, "must be a [width, height] pair");
        return;
    }
    for (i, n) in pair.iter().enumerate() {
        if !n.as_u64().is_some_and(|n| n > 0 && n <= u32::MAX as u64) {
            v.push(&schema::item(path, i), "must be a positive integer");
        }
    }
}

/// Relative path made only of normal components.
fn is_contained_relative(path: &str) -> bool {
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::PRESETS_JSON;

    fn parse(text: &str) -> Result<PresetCatalog, ConfigError> {
        PresetCatalog::from_json_str(text, Path::new("presets.json"))
    }

    fn violations(text: &str) -> Vec<String> {
        match parse(text) {
            Err(ConfigError::Invalid { violations, .. }) => violations,
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn parses_valid_catalog() {
        let catalog = parse(PRESETS_JSON).unwrap();
        assert_eq!(catalog.len(), 3);
        let hero = catalog.get("hero_main").unwrap();
        assert_eq!(hero.size(), ImageSize::Landscape);
        assert_eq!(hero.sizes, vec![(1920, 1080), (960, 540)]);
        assert_eq!(hero.formats, vec![OutputFormat::Jpg, OutputFormat::Webp]);
        assert_eq!(hero.quality.value(), 85);
    }

    #[test]
    fn defaults_apply_to_optional_fields() {
        let catalog = parse(PRESETS_JSON).unwrap();
        let slider = catalog.get("slider_emotion").unwrap();
        assert_eq!(slider.quality.value(), 90);
        assert_eq!(slider.size(), ImageSize::Square);
        assert_eq!(slider.output_dir(Path::new("public/img")), PathBuf::from("public/img/misc"));
        assert_eq!(slider.count(None), 3);
        assert_eq!(slider.count(Some(1)), 1);
    }

    #[test]
    fn final_prompt_appends_style_and_negative() {
        let catalog = parse(PRESETS_JSON).unwrap();
        let hero = catalog.get("hero_main").unwrap();
        assert_eq!(
            hero.final_prompt("sunlit counter"),
            "sunlit counter. Style: editorial photo, soft daylight. Avoid: text, watermark."
        );
    }

    #[test]
    fn final_prompt_without_negative_omits_avoid() {
        let catalog = parse(PRESETS_JSON).unwrap();
        let slider = catalog.get("slider_emotion").unwrap();
        assert_eq!(slider.final_prompt("p"), "p. Style: warm film look.");
    }

    #[test]
    fn unknown_preset_lists_available() {
        let catalog = parse(PRESETS_JSON).unwrap();
        match catalog.get("nope") {
            Err(ConfigError::UnknownPreset { name, available }) => {
                assert_eq!(name, "nope");
                assert_eq!(available, vec!["hero_main", "product_edit", "slider_emotion"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn reports_every_violation_at_once() {
        let found = violations(
            r#"{
                "bad": {
                    "style": { "base": "" },
                    "options": { "count": 42 },
                    "sizes": [[0, 100], [10]],
                    "formats": ["jpg", "gif"],
                    "quality": 101,
                    "output_subdir": "../escape",
                    "colour": "red"
                }
            }"#,
        );
        assert_eq!(
            found,
            vec![
                "bad.colour: unknown field",
                "bad.style.base: must not be empty",
                "bad.options.count: must be between 1 and 10",
                "bad.sizes[0][0]: must be a positive integer",
                "bad.sizes[1]: must be a [width, height] pair",
                "bad.formats[1]: unknown format 'gif' (expected jpg, png, webp or avif)",
                "bad.quality: must be between 1 and 100",
                "bad.output_subdir: must be a relative path inside the output root",
            ]
        );
    }

    #[test]
    fn missing_required_fields_are_reported() {
        let found = violations(r#"{"p": {}}"#);
        assert_eq!(
            found,
            vec![
                "p.style: missing required field",
                "p.sizes: missing required field",
                "p.formats: missing required field",
            ]
        );
    }

    #[test]
    fn empty_lists_and_wrong_root_are_reported() {
        assert_eq!(
            violations(r#"{"p": {"style": {"base": "b"}, "sizes": [], "formats": []}}"#),
            vec!["p.sizes: must not be empty", "p.formats: must not be empty"]
        );
        assert_eq!(violations("[]"), vec!["(root): must be an object"]);
        assert_eq!(violations("{}"), vec!["(root): must define at least one preset"]);
    }

    #[test]
    fn invalid_json_is_json_error() {
        assert!(matches!(parse("{"), Err(ConfigError::Json { .. })));
    }

    #[test]
    fn absolute_subdir_is_rejected() {
        assert!(!is_contained_relative("/etc"));
        assert!(!is_contained_relative("a/../../b"));
        assert!(is_contained_relative("product/edits"));
    }

    #[test]
    fn load_reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("presets.json");
        std::fs::write(&path, PRESETS_JSON).unwrap();
        assert_eq!(PresetCatalog::load(&path).unwrap().len(), 3);
        assert!(matches!(
            PresetCatalog::load(&tmp.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));
    }
}
