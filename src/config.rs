//! Pipeline configuration.
//!
//! Handles loading, validating, and merging `pixpress.toml`. Stock defaults
//! are the base layer; the user file is merged on top key by key, then a few
//! environment variables override provider settings.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! manifest = "public/img/manifest.json"
//! content_db = "content/images.json"
//! output_root = "public/img"
//! presets = "config/presets.json"
//! prompt_rules = "config/prompt-rules.json"
//!
//! [provider]
//! model = "gpt-image-1"
//! api_base = "https://api.openai.com/v1"
//! timeout_ms = 180000
//! retries = 3
//! base_delay_ms = 400
//! factor = 2.0
//! jitter = 0.2
//!
//! [edit]
//! sizes = [[1200, 1200], [800, 800]]
//! formats = ["jpg", "webp", "png"]
//! quality = 92
//! preset = "product_edit"
//! output_subdir = "product"
//! neutral_prompt = "studio product photography of a generic glass item on pure white, soft shadow"
//! cutout_tolerance = 32
//!
//! [linker]
//! hero_default = "hero_default"
//! slider_default = "slider_default"
//! product_default = "product_default"
//!
//! [prompt]
//! brand = "modern retail"
//!
//! [logo]
//! input_dir = "input/logos"
//! output_dir = "public/img/logos"
//! min_width = 1024
//! vectorize = true
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Environment
//!
//! | Variable | Overrides |
//! |---|---|
//! | `OPENAI_API_KEY` | provider key (never written to config or logs) |
//! | `OPENAI_TIMEOUT_MS` | `provider.timeout_ms` |
//! | `OPENAI_MAX_RETRIES` | `provider.retries` |
//! | `OPENAI_BASE_URL` | `provider.api_base` |
//!
//! Environment access goes through a lookup function so tests can inject
//! values without touching the process environment.
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{CutoutParams, EncodeConfig, LogoParams, OutputFormat, Quality};
use crate::provider::{OpenAiConfig, RetryPolicy};
use crate::types::Container;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "pixpress.toml";

/// Upper bound for `provider.retries`.
pub const MAX_RETRIES: u32 = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("{} has {} problem(s):\n  {}", .file.display(), .violations.len(), .violations.join("\n  "))]
    Invalid {
        file: PathBuf,
        violations: Vec<String>,
    },
    #[error("unknown preset '{name}' (available: {})", .available.join(", "))]
    UnknownPreset { name: String, available: Vec<String> },
}

/// Pipeline configuration loaded from `pixpress.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Locations of the durable documents and inputs.
    pub paths: PathsConfig,
    /// Image provider connection and retry policy.
    pub provider: ProviderConfig,
    /// Product edit workflow profile.
    pub edit: EditConfig,
    /// Latest-match fallback presets.
    pub linker: LinkerConfig,
    /// Prompt builder defaults.
    pub prompt: PromptConfig,
    /// Logo cleanup.
    pub logo: LogoConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.provider;
        if p.retries > MAX_RETRIES {
            return Err(ConfigError::Validation(format!(
                "provider.retries must be at most {MAX_RETRIES}"
            )));
        }
        if p.factor < 1.0 {
            return Err(ConfigError::Validation(
                "provider.factor must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&p.jitter) {
            return Err(ConfigError::Validation(
                "provider.jitter must be between 0 and 1".into(),
            ));
        }
        if p.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "provider.timeout_ms must be positive".into(),
            ));
        }
        let e = &self.edit;
        if e.sizes.is_empty() {
            return Err(ConfigError::Validation("edit.sizes must not be empty".into()));
        }
        if e.sizes.iter().any(|&(w, h)| w == 0 || h == 0) {
            return Err(ConfigError::Validation(
                "edit.sizes values must be non-zero".into(),
            ));
        }
        if e.formats.is_empty() {
            return Err(ConfigError::Validation(
                "edit.formats must not be empty".into(),
            ));
        }
        if !(1..=100).contains(&e.quality) {
            return Err(ConfigError::Validation("edit.quality must be 1-100".into()));
        }
        if self.logo.min_width == 0 {
            return Err(ConfigError::Validation(
                "logo.min_width must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()) {
            self.provider.api_key = Some(key);
        }
        if let Some(raw) = lookup("OPENAI_TIMEOUT_MS") {
            self.provider.timeout_ms = raw.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("OPENAI_TIMEOUT_MS must be an integer, got '{raw}'"))
            })?;
        }
        if let Some(raw) = lookup("OPENAI_MAX_RETRIES") {
            self.provider.retries = raw.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("OPENAI_MAX_RETRIES must be an integer, got '{raw}'"))
            })?;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL").filter(|u| !u.is_empty()) {
            self.provider.api_base = url;
        }
        Ok(())
    }
}

/// Where documents and inputs live, relative to the working directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub manifest: PathBuf,
    pub content_db: PathBuf,
    pub output_root: PathBuf,
    pub presets: PathBuf,
    pub prompt_rules: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            manifest: "public/img/manifest.json".into(),
            content_db: "content/images.json".into(),
            output_root: "public/img".into(),
            presets: "config/presets.json".into(),
            prompt_rules: "config/prompt-rules.json".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub model: String,
    pub api_base: String,
    /// Per-request network timeout.
    pub timeout_ms: u64,
    /// Retries after the first attempt.
    pub retries: u32,
    pub base_delay_ms: u64,
    pub factor: f64,
    /// Fraction of the delay added at random (0-1).
    pub jitter: f64,
    /// From `OPENAI_API_KEY` only.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            model: "gpt-image-1".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            timeout_ms: 180_000,
            retries: policy.retries,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            factor: policy.factor,
            jitter: policy.jitter,
            api_key: None,
        }
    }
}

impl ProviderConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            factor: self.factor,
            jitter: self.jitter,
        }
    }

    pub fn openai_config(&self) -> OpenAiConfig {
        OpenAiConfig {
            api_key: self.api_key.clone(),
            api_base: self.api_base.clone(),
            model: self.model.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

/// Product edit profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditConfig {
    pub sizes: Vec<(u32, u32)>,
    pub formats: Vec<OutputFormat>,
    pub quality: u32,
    /// Preset name recorded on manifest entries of edited items.
    pub preset: String,
    /// Subdirectory of the output root for edited items.
    pub output_subdir: String,
    /// Prompt for the last-resort generated replacement.
    pub neutral_prompt: String,
    /// Max per-channel distance from the background colour for local cut-out.
    pub cutout_tolerance: u8,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            sizes: vec![(1200, 1200), (800, 800)],
            formats: vec![OutputFormat::Jpg, OutputFormat::Webp, OutputFormat::Png],
            quality: 92,
            preset: "product_edit".to_string(),
            output_subdir: "product".to_string(),
            neutral_prompt:
                "studio product photography of a generic glass item on pure white, soft shadow"
                    .to_string(),
            cutout_tolerance: CutoutParams::default().tolerance,
        }
    }
}

impl EditConfig {
    pub fn encode_config(&self) -> EncodeConfig {
        EncodeConfig {
            sizes: self.sizes.clone(),
            formats: self.formats.clone(),
            quality: Quality::new(self.quality),
            placeholder: true,
        }
    }
}

/// Presets used by the latest-match strategy when nothing was recorded for
/// the exact page and container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkerConfig {
    pub hero_default: String,
    pub slider_default: String,
    pub product_default: String,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            hero_default: "hero_default".to_string(),
            slider_default: "slider_default".to_string(),
            product_default: "product_default".to_string(),
        }
    }
}

impl LinkerConfig {
    pub fn default_preset(&self, container: Container) -> &str {
        match container {
            Container::Hero => &self.hero_default,
            Container::Slider => &self.slider_default,
            Container::Product => &self.product_default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PromptConfig {
    /// Brand mood used when `prompt --brand` is not given.
    pub brand: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            brand: "modern retail".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogoConfig {
    /// Searched for the first image when neither `--file` nor `--url` is given.
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Narrower logos are upscaled to this width.
    pub min_width: u32,
    /// Also trace an SVG next to the PNG.
    pub vectorize: bool,
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            input_dir: "input/logos".into(),
            output_dir: "public/img/logos".into(),
            min_width: LogoParams::default().min_width,
            vectorize: true,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel encode workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PipelineConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<PipelineConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    Ok(merged.try_into()?)
}

/// Load the pipeline config.
///
/// With `path`, the file must exist. Without, [`DEFAULT_CONFIG_FILE`] is
/// used when present and stock defaults otherwise. Environment overrides
/// from `env` are applied last, then the result is validated.
pub fn load_config(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<PipelineConfig, ConfigError> {
    let overlay = match path {
        Some(p) => {
            let content = fs::read_to_string(p).map_err(|source| ConfigError::Read {
                path: p.to_path_buf(),
                source,
            })?;
            Some(toml::from_str(&content)?)
        }
        None => load_raw_config(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    let mut config = resolve_config(overlay)?;
    config.apply_env(env)?;
    config.validate()?;
    Ok(config)
}

/// Environment lookup backed by the process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Returns a fully-commented stock `pixpress.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Pixpress Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Paths (relative to the working directory)
# ---------------------------------------------------------------------------
[paths]
# Append-only record of every produced image.
manifest = "public/img/manifest.json"
# Page/container bindings read by the site build.
content_db = "content/images.json"
# Encoded variants are written below this directory.
output_root = "public/img"
# Preset catalogue and prompt rules (JSON, validated on load).
presets = "config/presets.json"
prompt_rules = "config/prompt-rules.json"

# ---------------------------------------------------------------------------
# Image provider
# ---------------------------------------------------------------------------
[provider]
model = "gpt-image-1"
# Override with OPENAI_BASE_URL.
api_base = "https://api.openai.com/v1"
# Per-request timeout. Override with OPENAI_TIMEOUT_MS.
timeout_ms = 180000
# Attempts = retries + 1. Override with OPENAI_MAX_RETRIES. At most 10.
retries = 3
# Wait after failed attempt i: base_delay_ms * factor^i * (1 + random * jitter)
base_delay_ms = 400
factor = 2.0
jitter = 0.2
# The API key is only read from OPENAI_API_KEY.

# ---------------------------------------------------------------------------
# Product edit workflow
# ---------------------------------------------------------------------------
[edit]
# Exact [width, height] boxes; images are cover-cropped to each.
sizes = [[1200, 1200], [800, 800]]
# jpg, png, webp, avif. A jpg variant also gets an inline .lqip.txt preview.
formats = ["jpg", "webp", "png"]
# Lossy quality (1-100).
quality = 92
# Preset name recorded in the manifest for edited items.
preset = "product_edit"
output_subdir = "product"
# Last-resort replacement when remote edit and local cut-out both fail.
neutral_prompt = "studio product photography of a generic glass item on pure white, soft shadow"
# Max per-channel distance from the border colour treated as background.
cutout_tolerance = 32

# ---------------------------------------------------------------------------
# Linker (latest-match strategy fallbacks)
# ---------------------------------------------------------------------------
[linker]
hero_default = "hero_default"
slider_default = "slider_default"
product_default = "product_default"

# ---------------------------------------------------------------------------
# Prompt builder
# ---------------------------------------------------------------------------
[prompt]
brand = "modern retail"

# ---------------------------------------------------------------------------
# Logo cleanup (flatten onto white, upscale, normalize, optional SVG trace)
# ---------------------------------------------------------------------------
[logo]
# First image here is used when neither --file nor --url is given.
input_dir = "input/logos"
output_dir = "public/img/logos"
# Narrower logos are upscaled to this width.
min_width = 1024
# Also write a traced .svg next to the .png.
vectorize = true

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel encode workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_matches_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.paths.manifest, PathBuf::from("public/img/manifest.json"));
        assert_eq!(config.paths.content_db, PathBuf::from("content/images.json"));
        assert_eq!(config.provider.timeout_ms, 180_000);
        assert_eq!(config.provider.retries, 3);
        assert_eq!(config.edit.sizes, vec![(1200, 1200), (800, 800)]);
        assert_eq!(config.edit.quality, 92);
        assert_eq!(config.linker.default_preset(Container::Slider), "slider_default");
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[provider]
retries = 5
"#;
        let config = resolve_config(Some(toml::from_str(toml).unwrap())).unwrap();
        assert_eq!(config.provider.retries, 5);
        assert_eq!(config.provider.base_delay_ms, 400);
        assert_eq!(config.edit.preset, "product_edit");
    }

    #[test]
    fn retry_policy_and_openai_config_follow_provider_section() {
        let mut provider = ProviderConfig {
            retries: 1,
            base_delay_ms: 10,
            timeout_ms: 500,
            ..ProviderConfig::default()
        };
        provider.api_key = Some("sk-test".into());
        let policy = provider.retry_policy();
        assert_eq!(policy.retries, 1);
        assert_eq!(policy.base_delay, Duration::from_millis(10));
        let openai = provider.openai_config();
        assert_eq!(openai.timeout, Duration::from_millis(500));
        assert_eq!(openai.api_key.as_deref(), Some("sk-test"));
    }

    // =========================================================================
    // Environment overrides
    // =========================================================================

    #[test]
    fn env_overrides_provider_settings() {
        let mut config = PipelineConfig::default();
        config
            .apply_env(env_of(&[
                ("OPENAI_API_KEY", "sk-abc"),
                ("OPENAI_TIMEOUT_MS", "2500"),
                ("OPENAI_MAX_RETRIES", "0"),
                ("OPENAI_BASE_URL", "http://localhost:8080/v1"),
            ]))
            .unwrap();
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-abc"));
        assert_eq!(config.provider.timeout_ms, 2500);
        assert_eq!(config.provider.retries, 0);
        assert_eq!(config.provider.api_base, "http://localhost:8080/v1");
    }

    #[test]
    fn invalid_env_number_is_validation_error() {
        let mut config = PipelineConfig::default();
        let result = config.apply_env(env_of(&[("OPENAI_MAX_RETRIES", "many")]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn api_key_is_never_serialized() {
        let mut config = PipelineConfig::default();
        config.provider.api_key = Some("sk-secret".into());
        let text = toml::to_string(&config).unwrap();
        assert!(!text.contains("sk-secret"));
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let cases: Vec<fn(&mut PipelineConfig)> = vec![
            |c: &mut PipelineConfig| c.provider.retries = 11,
            |c: &mut PipelineConfig| c.provider.factor = 0.5,
            |c: &mut PipelineConfig| c.provider.jitter = 1.5,
            |c: &mut PipelineConfig| c.provider.timeout_ms = 0,
            |c: &mut PipelineConfig| c.edit.sizes.clear(),
            |c: &mut PipelineConfig| c.edit.sizes = vec![(0, 100)],
            |c: &mut PipelineConfig| c.edit.formats.clear(),
            |c: &mut PipelineConfig| c.edit.quality = 0,
            |c: &mut PipelineConfig| c.edit.quality = 101,
            |c: &mut PipelineConfig| c.logo.min_width = 0,
        ];
        for (i, mutate) in cases.into_iter().enumerate() {
            let mut config = PipelineConfig::default();
            mutate(&mut config);
            assert!(
                matches!(config.validate(), Err(ConfigError::Validation(_))),
                "case {i} should fail"
            );
        }
    }

    #[test]
    fn validate_accepts_boundaries() {
        let mut config = PipelineConfig::default();
        config.provider.retries = MAX_RETRIES;
        config.provider.factor = 1.0;
        config.provider.jitter = 0.0;
        config.edit.quality = 100;
        assert!(config.validate().is_ok());
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_reads_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(
            &path,
            r#"
[paths]
manifest = "out/manifest.json"

[linker]
hero_default = "hero_home"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path), no_env).unwrap();
        assert_eq!(config.paths.manifest, PathBuf::from("out/manifest.json"));
        assert_eq!(config.paths.output_root, PathBuf::from("public/img"));
        assert_eq!(config.linker.default_preset(Container::Hero), "hero_home");
    }

    #[test]
    fn load_config_missing_explicit_file_errors() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(Some(&tmp.path().join("nope.toml")), no_env);
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn load_config_validates_after_env() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("p.toml");
        fs::write(&path, "").unwrap();
        let result = load_config(Some(&path), env_of(&[("OPENAI_MAX_RETRIES", "50")]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let toml = r#"
[provider]
retrys = 3
"#;
        let result = resolve_config(Some(toml::from_str(toml).unwrap()));
        assert!(result.is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let result = resolve_config(Some(toml::from_str("[gallery]\nx = 1").unwrap()));
        assert!(result.is_err());
    }

    #[test]
    fn load_raw_config_returns_none_when_no_file() {
        let tmp = TempDir::new().unwrap();
        assert!(load_raw_config(&tmp.path().join("pixpress.toml")).unwrap().is_none());
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"quality = 90"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"quality = 70"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("quality").unwrap().as_integer(), Some(70));
    }

    #[test]
    fn merge_toml_preserves_base_keys_and_replaces_arrays() {
        let base: toml::Value = toml::from_str(
            r#"
[edit]
sizes = [[1200, 1200], [800, 800]]
quality = 92
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[edit]
sizes = [[600, 600]]
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let edit = merged.get("edit").unwrap();
        assert_eq!(edit.get("sizes").unwrap().as_array().unwrap().len(), 1);
        assert_eq!(edit.get("quality").unwrap().as_integer(), Some(92));
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: PipelineConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in [
            "[paths]",
            "[provider]",
            "[edit]",
            "[linker]",
            "[prompt]",
            "[logo]",
            "[processing]",
        ] {
            assert!(content.contains(section), "{section}");
        }
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        for section in ["paths", "provider", "edit", "linker", "prompt", "logo", "processing"] {
            assert!(val.get(section).is_some(), "{section}");
        }
    }

    // =========================================================================
    // effective_threads tests
    // =========================================================================

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_auto_uses_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }
}
