//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::load_from_memory` |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` |
//! | Cover crop | `image::DynamicImage::crop_imm` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | Encode → WebP | `webp::Encoder` (libwebp, lossy, quality) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Placeholder | 32px JPEG at quality 30, `base64` data URI |
//! | Background removal | border flood fill, see [`cutout`](super::cutout) |
//! | Logo cleanup | flatten + Lanczos3 upscale + [`levels`](super::levels), PNG at best compression |
//! | Vectorize | `vtracer::convert_image_to_svg`, binary colour mode |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{
    calculate_fill_dimensions, center_crop_offset, placeholder_dimensions, upscale_to_min_width,
};
use super::cutout;
use super::levels;
use super::params::{CutoutParams, LogoParams, OutputFormat, RenderParams};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// JPEG quality of the inline preview.
const PLACEHOLDER_QUALITY: u8 = 30;

/// Extensions of source files the edit workflow accepts.
pub const SUPPORTED_INPUT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(source: &[u8]) -> Result<DynamicImage, BackendError> {
    image::load_from_memory(source)
        .map_err(|e| BackendError::ProcessingFailed(format!("Failed to decode image: {}", e)))
}

/// Fill-resize then center-crop to exactly `width`×`height`.
fn cover(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (fill_w, fill_h) = calculate_fill_dimensions((img.width(), img.height()), (width, height));
    let filled = img.resize_exact(fill_w, fill_h, FilterType::Lanczos3);
    let (x, y) = center_crop_offset((fill_w, fill_h), (width, height));
    filled.crop_imm(x, y, width, height)
}

/// Encode an image into `format`. `quality` only affects lossy formats.
fn encode(img: &DynamicImage, format: OutputFormat, quality: u32) -> Result<Vec<u8>, BackendError> {
    let mut out = Vec::new();
    let result = match format {
        OutputFormat::Jpg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality as u8))
        }
        OutputFormat::Png => img.write_with_encoder(PngEncoder::new(&mut out)),
        OutputFormat::Webp => return encode_webp(img, quality),
        OutputFormat::Avif => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_with_encoder(AvifEncoder::new_with_speed_quality(&mut out, 6, quality as u8))
        }
    };
    result.map_err(|e| BackendError::ProcessingFailed(format!("{} encode failed: {}", format, e)))?;
    Ok(out)
}

/// Lossy WebP via libwebp. Alpha is kept when the image has it.
fn encode_webp(img: &DynamicImage, quality: u32) -> Result<Vec<u8>, BackendError> {
    let pixels = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    let encoder = webp::Encoder::from_image(&pixels)
        .map_err(|e| BackendError::ProcessingFailed(format!("webp encode failed: {}", e)))?;
    Ok(encoder.encode(quality as f32).to_vec())
}

/// Tiny JPEG preview as a `data:` URI.
fn placeholder_data_uri(img: &DynamicImage) -> Result<String, BackendError> {
    let (w, h) = placeholder_dimensions((img.width(), img.height()));
    let tiny = img.resize_exact(w, h, FilterType::Triangle);
    let bytes = encode(&tiny, OutputFormat::Jpg, PLACEHOLDER_QUALITY as u32)?;
    Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(bytes)))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), BackendError> {
    std::fs::write(path, bytes)?;
    debug!(file = %path.display(), bytes = bytes.len(), "wrote file");
    Ok(())
}

impl ImageBackend for RustBackend {
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::new(Cursor::new(source))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| {
                BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
            })?;
        Ok(Dimensions { width, height })
    }

    fn render(&self, source: &[u8], params: &RenderParams) -> Result<(), BackendError> {
        let img = decode(source)?;
        let sized = cover(&img, params.width, params.height);

        for target in &params.targets {
            let bytes = encode(&sized, target.format, params.quality.value())?;
            write_file(&target.path, &bytes)?;
        }

        if let Some(path) = &params.placeholder {
            let uri = placeholder_data_uri(&sized)?;
            write_file(path, uri.as_bytes())?;
        }
        Ok(())
    }

    fn remove_background(&self, source: &[u8], params: &CutoutParams) -> Result<Vec<u8>, BackendError> {
        let mut rgba = decode(source)?.to_rgba8();
        let removed = cutout::remove_background(&mut rgba, params.tolerance)?;
        debug!(removed, tolerance = params.tolerance, "background removed");

        let result = match params.matte {
            Some(colour) => cutout::flatten(&rgba, colour),
            None => rgba,
        };
        encode(&DynamicImage::ImageRgba8(result), OutputFormat::Png, 100)
    }

    fn clean_logo(&self, source: &[u8], params: &LogoParams) -> Result<Vec<u8>, BackendError> {
        let img = decode(source)?;
        let flat = cutout::flatten(&img.to_rgba8(), CutoutParams::WHITE);
        let mut rgb = DynamicImage::ImageRgba8(flat).to_rgb8();

        if let Some((w, h)) = upscale_to_min_width(rgb.dimensions(), params.min_width) {
            debug!(from = rgb.width(), to = w, "upscaling logo");
            rgb = image::imageops::resize(&rgb, w, h, FilterType::Lanczos3);
        }
        levels::stretch(&mut rgb, levels::DEFAULT_CLIP);

        let mut out = Vec::new();
        DynamicImage::ImageRgb8(rgb)
            .write_with_encoder(PngEncoder::new_with_quality(
                &mut out,
                CompressionType::Best,
                PngFilter::Adaptive,
            ))
            .map_err(|e| BackendError::ProcessingFailed(format!("png encode failed: {}", e)))?;
        Ok(out)
    }

    fn trace_svg(&self, raster: &Path, svg: &Path) -> Result<(), BackendError> {
        let config = vtracer::Config {
            color_mode: vtracer::ColorMode::Binary,
            filter_speckle: 2,
            ..vtracer::Config::default()
        };
        vtracer::convert_image_to_svg(raster, svg, config).map_err(BackendError::Trace)?;
        debug!(file = %svg.display(), "traced svg");
        Ok(())
    }
}
