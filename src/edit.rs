//! Product edit workflow.
//!
//! Every image directly inside the input directory goes through a chain of
//! tiers until one yields a usable buffer:
//!
//! 1. **Remote edit** of the staged source with the mode prompt.
//! 2. **Local cut-out** of the border-connected background (isolation modes
//!    only).
//! 3. **Neutral generate**: a generic studio image, accepted as is.
//!
//! A failing tier is logged and the next one runs. Items are independent:
//! an unreadable file, an exhausted chain or an encode failure skips that
//! item and the batch moves on. Entries for the items that made it are
//! appended to the manifest in input order.

use crate::config::EditConfig;
use crate::imaging::{
    BackendError, CutoutParams, ImageBackend, SUPPORTED_INPUT_EXTENSIONS, encode_variants,
};
use crate::manifest::{self, ManifestError, NewEntry};
use crate::naming;
use crate::provider::{ImageProvider, ProviderError};
use crate::types::ImageSize;
use chrono::{DateTime, Utc};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Canvas size requested for remote edits and the neutral replacement.
pub const EDIT_SIZE: ImageSize = ImageSize::Square;

#[derive(Error, Debug)]
pub enum EditError {
    #[error("failed to list {path}: {source}")]
    ListInputs {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to stage source: {0}")]
    Stage(std::io::Error),
    #[error("every tier failed: {}", format_failures(.0))]
    DegradationExhausted(Vec<TierFailure>),
    #[error("failed to encode: {0}")]
    Encode(#[from] BackendError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

fn format_failures(failures: &[TierFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// What the edit should achieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    /// Product on pure white with a soft shadow.
    #[default]
    IsolateWhite,
    /// Product on a transparent background.
    Transparent,
    /// Better light and realism, background untouched.
    Enhance,
}

impl EditMode {
    pub const ALL: [EditMode; 3] = [EditMode::IsolateWhite, EditMode::Transparent, EditMode::Enhance];

    pub fn as_str(self) -> &'static str {
        match self {
            EditMode::IsolateWhite => "isolate-white",
            EditMode::Transparent => "transparent",
            EditMode::Enhance => "enhance",
        }
    }

    /// Prompt sent with the remote edit.
    pub fn prompt(self) -> &'static str {
        match self {
            EditMode::IsolateWhite => {
                "Isolate product on pure white background with a soft natural shadow; preserve exact proportions and labels"
            }
            EditMode::Transparent => {
                "Isolate product on a fully transparent background; preserve exact proportions and labels"
            }
            EditMode::Enhance => "Enhance product realism and lighting",
        }
    }

    /// Whether the mode removes the background, enabling the local tier.
    pub fn isolates(self) -> bool {
        !matches!(self, EditMode::Enhance)
    }

    pub fn transparent(self) -> bool {
        matches!(self, EditMode::Transparent)
    }

    /// Local cut-out settings, `None` when the mode has no local tier.
    pub fn cutout(self, tolerance: u8) -> Option<CutoutParams> {
        match self {
            EditMode::IsolateWhite => Some(CutoutParams {
                tolerance,
                matte: Some(CutoutParams::WHITE),
            }),
            EditMode::Transparent => Some(CutoutParams {
                tolerance,
                matte: None,
            }),
            EditMode::Enhance => None,
        }
    }
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                format!("unknown edit mode '{s}' (expected isolate-white, transparent or enhance)")
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    RemoteEdit,
    LocalCutout,
    NeutralGenerate,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::RemoteEdit => "remote edit",
            Tier::LocalCutout => "local cut-out",
            Tier::NeutralGenerate => "neutral generate",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierFailure {
    pub tier: Tier,
    pub reason: String,
}

impl fmt::Display for TierFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.tier, self.reason)
    }
}

/// One edit batch.
#[derive(Debug, Clone)]
pub struct EditJob<'a> {
    pub input_dir: &'a Path,
    pub output_root: &'a Path,
    pub manifest_path: &'a Path,
    pub mode: EditMode,
    pub profile: &'a EditConfig,
    pub now: DateTime<Utc>,
}

impl EditJob<'_> {
    pub fn output_dir(&self) -> PathBuf {
        self.output_root.join(&self.profile.output_subdir)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditedItem {
    pub source: PathBuf,
    /// Tier that produced the encoded buffer.
    pub tier: Tier,
    /// Tiers that failed before it.
    pub fell_through: Vec<TierFailure>,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedItem {
    pub source: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditReport {
    pub edited: Vec<EditedItem>,
    pub skipped: Vec<SkippedItem>,
    /// Manifest index of the first appended entry, if any were appended.
    pub first_index: Option<usize>,
}

/// Image files directly inside `dir`, sorted by file name.
pub fn list_inputs(dir: &Path) -> Result<Vec<PathBuf>, EditError> {
    let mut inputs = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| EditError::ListInputs {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_supported_input(entry.path()) {
            inputs.push(entry.into_path());
        }
    }
    Ok(inputs)
}

fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_INPUT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Run the degradation chain for one source.
///
/// `staged` is the source as a file the provider can upload; `source` is
/// the same bytes for the local tier. Returns the winning buffer, its tier
/// and the failures of the tiers before it.
pub async fn run_chain<B: ImageBackend>(
    provider: &dyn ImageProvider,
    backend: &B,
    staged: &Path,
    source: &[u8],
    mode: EditMode,
    profile: &EditConfig,
) -> Result<(Vec<u8>, Tier, Vec<TierFailure>), EditError> {
    let mut failures = Vec::new();

    match provider
        .edit(staged, mode.prompt(), EDIT_SIZE, mode.transparent())
        .await
    {
        Ok(buffer) => return Ok((buffer, Tier::RemoteEdit, failures)),
        Err(e) => {
            warn!(error = %e, "remote edit failed, trying next tier");
            failures.push(TierFailure {
                tier: Tier::RemoteEdit,
                reason: e.to_string(),
            });
        }
    }

    if let Some(params) = mode.cutout(profile.cutout_tolerance) {
        match backend.remove_background(source, &params) {
            Ok(buffer) => return Ok((buffer, Tier::LocalCutout, failures)),
            Err(e) => {
                warn!(error = %e, "local cut-out failed, trying next tier");
                failures.push(TierFailure {
                    tier: Tier::LocalCutout,
                    reason: e.to_string(),
                });
            }
        }
    }

    warn!("generating neutral studio image as last resort");
    let generated = provider
        .generate(&profile.neutral_prompt, EDIT_SIZE, 1)
        .await
        .and_then(|buffers| buffers.into_iter().next().ok_or(ProviderError::EmptyResponse));
    match generated {
        Ok(buffer) => Ok((buffer, Tier::NeutralGenerate, failures)),
        Err(e) => {
            failures.push(TierFailure {
                tier: Tier::NeutralGenerate,
                reason: e.to_string(),
            });
            Err(EditError::DegradationExhausted(failures))
        }
    }
}

/// Base name for the `index`-th (1-based) input of a batch:
/// `{preset}-{slug(stem)}-{stamp}-{index:02}`.
///
/// Every item of a batch shares one stamp, and distinct inputs can share a
/// slug (`shoe.jpg` and `shoe.png`), so the input position keeps them apart.
pub fn edit_base_name(preset: &str, source: &Path, index: usize, now: DateTime<Utc>) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let base = format!("{}-{}-{}", preset, naming::slug(&stem), naming::stamp(now));
    naming::batch_stem(&base, index)
}

/// Copy the source into a scoped temp file with the same extension. The
/// file is removed when the returned handle drops.
fn stage(source: &Path, bytes: &[u8]) -> Result<tempfile::NamedTempFile, EditError> {
    let suffix = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let mut staged = tempfile::Builder::new()
        .prefix("pixpress-edit-")
        .suffix(&suffix)
        .tempfile()
        .map_err(EditError::Stage)?;
    staged.write_all(bytes).map_err(EditError::Stage)?;
    staged.flush().map_err(EditError::Stage)?;
    Ok(staged)
}

async fn edit_one<B: ImageBackend>(
    provider: &dyn ImageProvider,
    backend: &B,
    job: &EditJob<'_>,
    source: &Path,
    index: usize,
) -> Result<EditedItem, EditError> {
    let bytes = tokio::fs::read(source)
        .await
        .map_err(|e| EditError::Read {
            path: source.to_path_buf(),
            source: e,
        })?;
    let staged = stage(source, &bytes)?;

    let (buffer, tier, fell_through) =
        run_chain(provider, backend, staged.path(), &bytes, job.mode, job.profile).await?;
    drop(staged);

    let base_name = edit_base_name(&job.profile.preset, source, index, job.now);
    let files = encode_variants(
        backend,
        &buffer,
        &job.output_dir(),
        &base_name,
        &job.profile.encode_config(),
    )?;
    Ok(EditedItem {
        source: source.to_path_buf(),
        tier,
        fell_through,
        files,
    })
}

/// Edit every input in `job.input_dir` and record the results.
///
/// Only listing the inputs and the final manifest append can fail the batch.
pub async fn run_edit_batch<B: ImageBackend>(
    provider: &dyn ImageProvider,
    backend: &B,
    job: &EditJob<'_>,
) -> Result<EditReport, EditError> {
    let inputs = list_inputs(job.input_dir)?;
    info!(
        inputs = inputs.len(),
        mode = %job.mode,
        dir = %job.input_dir.display(),
        "starting edit batch"
    );

    let mut report = EditReport::default();
    for (i, source) in inputs.into_iter().enumerate() {
        match edit_one(provider, backend, job, &source, i + 1).await {
            Ok(item) => {
                info!(file = %source.display(), tier = %item.tier, "edited");
                report.edited.push(item);
            }
            Err(e) => {
                warn!(file = %source.display(), error = %e, "skipping item");
                report.skipped.push(SkippedItem {
                    source,
                    reason: e.to_string(),
                });
            }
        }
    }

    if !report.edited.is_empty() {
        let entries = report
            .edited
            .iter()
            .map(|item| NewEntry {
                preset: job.profile.preset.clone(),
                prompt: job.mode.prompt().to_string(),
                files: item
                    .files
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect(),
                created_at: Some(job.now),
                container: Some("product".to_string()),
                ..Default::default()
            })
            .collect();
        let receipt = manifest::append_at(job.manifest_path, entries, job.now)?;
        report.first_index = Some(receipt.first_index);
    }

    Ok(report)
}
