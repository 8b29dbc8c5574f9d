//! Image processing: the encoder stage of the pipeline.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Cover crop + resize** | Lanczos3 `resize_exact` + `crop_imm` |
//! | **Encode** | `image` codecs (JPEG, PNG, AVIF), `webp` (lossy WebP) |
//! | **Placeholder** | 32px JPEG as a base64 data URI |
//! | **Background removal** | border flood fill |
//! | **Logo cleanup** | flatten, upscale, level stretch, max-compression PNG |
//! | **Vectorize** | `vtracer` binary trace to SVG |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`encode_variants`], naming and fan-out over sizes

pub mod backend;
mod calculations;
pub mod cutout;
pub mod levels;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use operations::{EncodeConfig, PLACEHOLDER_FORMAT, encode_variants, plan_variants};
pub use params::{CutoutParams, EncodeTarget, LogoParams, OutputFormat, Quality, RenderParams};
pub use rust_backend::{RustBackend, SUPPORTED_INPUT_EXTENSIONS};
