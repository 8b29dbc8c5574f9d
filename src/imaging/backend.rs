//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the operations every backend must
//! support: identify, render, remove_background, clean_logo and
//! trace_svg. All but the last work on an encoded source buffer.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust on top of
//! the `image` crate.

use super::cutout::CutoutError;
use super::params::{CutoutParams, LogoParams, RenderParams};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Background removal failed: {0}")]
    Cutout(#[from] CutoutError),
    #[error("Vectorize failed: {0}")]
    Trace(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` because the encoder renders sizes in parallel on the rayon pool.
pub trait ImageBackend: Sync {
    /// Decode enough of `source` to report its dimensions.
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError>;

    /// Cover-crop `source` to the requested box and write every target file
    /// (plus the placeholder sidecar when requested).
    fn render(&self, source: &[u8], params: &RenderParams) -> Result<(), BackendError>;

    /// Remove the border-connected background. Returns an encoded PNG.
    fn remove_background(&self, source: &[u8], params: &CutoutParams) -> Result<Vec<u8>, BackendError>;

    /// Flatten onto white, drop alpha, upscale to `min_width`, stretch
    /// levels. Returns an encoded PNG.
    fn clean_logo(&self, source: &[u8], params: &LogoParams) -> Result<Vec<u8>, BackendError>;

    /// Trace the raster at `raster` into an SVG file at `svg`.
    fn trace_svg(&self, raster: &Path, svg: &Path) -> Result<(), BackendError>;
}
