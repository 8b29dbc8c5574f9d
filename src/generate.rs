//! Generation workflow.
//!
//! Turns a preset plus prompt metadata into encoded files and manifest
//! entries:
//!
//! 1. Compose the final prompt from the preset style.
//! 2. Ask the provider for `count` images (retries live in the provider).
//! 3. Encode every returned buffer with the preset's sizes and formats.
//! 4. Append one manifest entry per buffer, in buffer order.
//!
//! A provider error aborts the run before anything is written to the
//! manifest. The report carries the manifest index of the first appended
//! entry, which is what `link --from-index` expects.
//!
//! ## Output Structure
//!
//! ```text
//! public/img/
//! ├── manifest.json
//! └── hero/
//!     ├── hero_main-sunlit-shop-counter-2026-03-01T10-15-00-000Z-01-1920x1080.jpg
//!     ├── hero_main-sunlit-shop-counter-2026-03-01T10-15-00-000Z-01-1920x1080.jpg.lqip.txt
//!     ├── hero_main-sunlit-shop-counter-2026-03-01T10-15-00-000Z-01-1920x1080.webp
//!     └── ...
//! ```

use crate::imaging::{BackendError, ImageBackend, encode_variants};
use crate::manifest::{self, ManifestError, NewEntry};
use crate::naming;
use crate::presets::{MAX_COUNT, Preset};
use crate::prompt::PromptMeta;
use crate::provider::{ImageProvider, ProviderError};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("prompt missing (provide --prompt or a --meta file with a prompt)")]
    MissingPrompt,
    #[error("count must be between 1 and {MAX_COUNT}, got {0}")]
    InvalidCount(u32),
    #[error("failed to read meta file {path}: {source}")]
    MetaRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid meta JSON in {path}: {source}")]
    MetaParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("image generation failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("failed to encode image {index}: {source}")]
    Encode {
        index: usize,
        source: BackendError,
    },
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// One generation run.
#[derive(Debug, Clone)]
pub struct GenerateRequest<'a> {
    pub preset_name: &'a str,
    pub preset: &'a Preset,
    pub meta: PromptMeta,
    /// Overrides the preset count.
    pub count: Option<u32>,
}

/// Files written for one provider buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub base_name: String,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub preset: String,
    pub final_prompt: String,
    pub images: Vec<GeneratedImage>,
    /// Manifest index of the first appended entry.
    pub first_index: usize,
}

/// Read a `--meta` file: `{prompt, page, container, alt, description, keywords}`.
pub fn load_meta(path: &Path) -> Result<PromptMeta, GenerateError> {
    let text = std::fs::read_to_string(path).map_err(|source| GenerateError::MetaRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| GenerateError::MetaParse {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn run_generation<B: ImageBackend>(
    provider: &dyn ImageProvider,
    backend: &B,
    request: &GenerateRequest<'_>,
    output_root: &Path,
    manifest_path: &Path,
    now: DateTime<Utc>,
) -> Result<GenerationReport, GenerateError> {
    let meta = &request.meta;
    if meta.prompt.trim().is_empty() {
        return Err(GenerateError::MissingPrompt);
    }
    let preset = request.preset;
    let count = preset.count(request.count);
    if count == 0 || u64::from(count) > MAX_COUNT {
        return Err(GenerateError::InvalidCount(count));
    }

    let final_prompt = preset.final_prompt(&meta.prompt);
    let size = preset.size();
    info!(
        preset = request.preset_name,
        provider = provider.provider_name(),
        %size,
        count,
        "generating images"
    );
    let buffers = provider.generate(&final_prompt, size, count).await?;

    let output_dir = preset.output_dir(output_root);
    let encode = preset.encode_config();
    let stem = naming::file_stem(&meta.prompt, request.preset_name, now);

    let mut images = Vec::with_capacity(buffers.len());
    for (i, buffer) in buffers.iter().enumerate() {
        let index = i + 1;
        let base_name = naming::batch_stem(&stem, index);
        let files = encode_variants(backend, buffer, &output_dir, &base_name, &encode)
            .map_err(|source| GenerateError::Encode { index, source })?;
        info!(index, files = files.len(), base_name, "encoded image");
        images.push(GeneratedImage { base_name, files });
    }

    let entries = images
        .iter()
        .map(|image| NewEntry {
            preset: request.preset_name.to_string(),
            prompt: meta.prompt.clone(),
            files: image
                .files
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            created_at: Some(now),
            page: meta.page.clone(),
            container: meta.container.clone(),
            alt: meta.alt.clone(),
            description: meta.description.clone(),
            keywords: meta.keywords.clone(),
        })
        .collect();
    let receipt = manifest::append_at(manifest_path, entries, now)?;
    info!(
        preset = request.preset_name,
        items = receipt.added,
        first_index = receipt.first_index,
        "generation complete"
    );

    Ok(GenerationReport {
        preset: request.preset_name.to_string(),
        final_prompt,
        images,
        first_index: receipt.first_index,
    })
}
