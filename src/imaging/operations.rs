//! High-level image operations.
//!
//! These functions combine naming and calculations with backend execution.
//! They take an encode profile, plan every file to write, and call the
//! backend.

use super::backend::{BackendError, ImageBackend};
use super::params::{EncodeTarget, OutputFormat, Quality, RenderParams};
use crate::naming;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Format whose variants get the inline preview sidecar.
pub const PLACEHOLDER_FORMAT: OutputFormat = OutputFormat::Jpg;

/// Sizes, formats and quality for one encode call.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeConfig {
    /// Exact output boxes as `(width, height)`, in output order.
    pub sizes: Vec<(u32, u32)>,
    pub formats: Vec<OutputFormat>,
    pub quality: Quality,
    /// Emit the preview sidecar when [`PLACEHOLDER_FORMAT`] is among `formats`.
    pub placeholder: bool,
}

/// Plan every render without executing anything.
///
/// One [`RenderParams`] per size, in `sizes` order; each carries one target
/// per format in `formats` order. File names depend only on
/// `(base_name, size, format)`.
pub fn plan_variants(output_dir: &Path, base_name: &str, config: &EncodeConfig) -> Vec<RenderParams> {
    let with_placeholder = config.placeholder && config.formats.contains(&PLACEHOLDER_FORMAT);

    config
        .sizes
        .iter()
        .map(|&(width, height)| {
            let targets = config
                .formats
                .iter()
                .map(|&format| EncodeTarget {
                    path: output_dir.join(naming::variant_file_name(
                        base_name,
                        width,
                        height,
                        format.extension(),
                    )),
                    format,
                })
                .collect();

            let placeholder = with_placeholder.then(|| {
                let main = naming::variant_file_name(base_name, width, height, PLACEHOLDER_FORMAT.extension());
                output_dir.join(naming::placeholder_file_name(&main))
            });

            RenderParams {
                width,
                height,
                quality: config.quality,
                targets,
                placeholder,
            }
        })
        .collect()
}

/// Encode one source buffer into every size × format variant under
/// `output_dir`.
///
/// Sizes render in parallel; the returned paths are the main files only, in
/// size-major, format-minor order. Placeholder sidecars are not listed.
pub fn encode_variants(
    backend: &impl ImageBackend,
    source: &[u8],
    output_dir: &Path,
    base_name: &str,
    config: &EncodeConfig,
) -> Result<Vec<PathBuf>> {
    let dims = backend.identify(source)?;
    debug!(
        base_name,
        source_width = dims.width,
        source_height = dims.height,
        sizes = config.sizes.len(),
        formats = config.formats.len(),
        "encoding variants"
    );

    std::fs::create_dir_all(output_dir)?;
    let plans = plan_variants(output_dir, base_name, config);

    plans
        .par_iter()
        .map(|params| backend.render(source, params))
        .collect::<Result<Vec<()>>>()?;

    Ok(plans
        .into_iter()
        .flat_map(|p| p.targets.into_iter().map(|t| t.path))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};

    fn config(sizes: &[(u32, u32)], formats: &[OutputFormat], placeholder: bool) -> EncodeConfig {
        EncodeConfig {
            sizes: sizes.to_vec(),
            formats: formats.to_vec(),
            quality: Quality::new(82),
            placeholder,
        }
    }

    #[test]
    fn produces_sizes_times_formats_files_in_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::new();
        let cfg = config(
            &[(1920, 1080), (960, 540)],
            &[OutputFormat::Jpg, OutputFormat::Webp, OutputFormat::Avif],
            false,
        );

        let files = encode_variants(&backend, &[0], tmp.path(), "hero-x", &cfg).unwrap();

        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "hero-x-1920x1080.jpg",
                "hero-x-1920x1080.webp",
                "hero-x-1920x1080.avif",
                "hero-x-960x540.jpg",
                "hero-x-960x540.webp",
                "hero-x-960x540.avif",
            ]
        );
        assert_eq!(backend.renders().len(), 2);
    }

    #[test]
    fn placeholder_once_per_size_when_jpg_requested() {
        let plans = plan_variants(
            Path::new("/out"),
            "b",
            &config(&[(800, 800), (400, 400)], &[OutputFormat::Png, OutputFormat::Jpg], true),
        );
        let placeholders: Vec<_> = plans.iter().filter_map(|p| p.placeholder.clone()).collect();
        assert_eq!(
            placeholders,
            vec![
                PathBuf::from("/out/b-800x800.jpg.lqip.txt"),
                PathBuf::from("/out/b-400x400.jpg.lqip.txt"),
            ]
        );
    }

    #[test]
    fn no_placeholder_without_preview_format() {
        let plans = plan_variants(
            Path::new("/out"),
            "b",
            &config(&[(800, 800)], &[OutputFormat::Webp], true),
        );
        assert!(plans[0].placeholder.is_none());
    }

    #[test]
    fn no_placeholder_when_disabled() {
        let plans = plan_variants(
            Path::new("/out"),
            "b",
            &config(&[(800, 800)], &[OutputFormat::Jpg], false),
        );
        assert!(plans[0].placeholder.is_none());
    }

    #[test]
    fn paths_are_identical_across_calls() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::new();
        let cfg = config(&[(100, 50)], &[OutputFormat::Jpg, OutputFormat::Png], true);

        let first = encode_variants(&backend, &[0], tmp.path(), "same", &cfg).unwrap();
        let second = encode_variants(&backend, &[0], tmp.path(), "same", &cfg).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn quality_is_passed_through() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::new();
        encode_variants(
            &backend,
            &[0],
            tmp.path(),
            "q",
            &config(&[(10, 10)], &[OutputFormat::Jpg], false),
        )
        .unwrap();
        assert!(matches!(&backend.renders()[0], RecordedOp::Render { quality: 82, .. }));
    }

    #[test]
    fn undecodable_source_renders_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::undecodable();
        let cfg = config(&[(10, 10)], &[OutputFormat::Jpg], false);
        assert!(encode_variants(&backend, &[0], tmp.path(), "x", &cfg).is_err());
        assert!(backend.renders().is_empty());
    }

    #[test]
    fn render_failure_propagates() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::new();
        *backend.fail_render.lock().unwrap() = true;
        let cfg = config(&[(10, 10), (5, 5)], &[OutputFormat::Jpg], false);
        assert!(encode_variants(&backend, &[0], tmp.path(), "x", &cfg).is_err());
    }

    #[test]
    fn real_backend_writes_every_listed_file_and_sidecars() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = crate::imaging::RustBackend::new();
        let cfg = config(
            &[(64, 36), (32, 32)],
            &[OutputFormat::Jpg, OutputFormat::Png],
            true,
        );

        let files = encode_variants(
            &backend,
            &crate::test_helpers::png_bytes(80, 80),
            &tmp.path().join("nested"),
            "real",
            &cfg,
        )
        .unwrap();

        assert_eq!(files.len(), 4);
        for f in &files {
            assert!(f.exists(), "{}", f.display());
        }
        let sidecars = std::fs::read_dir(tmp.path().join("nested"))
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".lqip.txt")
            })
            .count();
        assert_eq!(sidecars, 2);
    }
}
