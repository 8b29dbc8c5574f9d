//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Width of the inline low-quality preview.
pub const PLACEHOLDER_WIDTH: u32 = 32;

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
///
/// # Returns
/// * `(width, height)` - Fill dimensions (at least one matches target)
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = (h as f64 * src_aspect).round() as u32;
        (w.max(tgt_w), h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = (w as f64 / src_aspect).round() as u32;
        (w, h.max(tgt_h))
    }
}

/// Top-left corner of a `target` box centred in a `filled` image.
///
/// Overflow is split evenly; an odd pixel goes to the right/bottom.
pub fn center_crop_offset(filled: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    (
        filled.0.saturating_sub(target.0) / 2,
        filled.1.saturating_sub(target.1) / 2,
    )
}

/// Preview dimensions: [`PLACEHOLDER_WIDTH`] wide, height keeping the aspect
/// ratio of `size`, never below one pixel.
pub fn placeholder_dimensions(size: (u32, u32)) -> (u32, u32) {
    let (w, h) = size;
    let height = (PLACEHOLDER_WIDTH as f64 * h as f64 / w as f64).round() as u32;
    (PLACEHOLDER_WIDTH, height.max(1))
}

/// Size to upscale to so the width reaches `min_width`, keeping the aspect
/// ratio. `None` when the source is already wide enough.
pub fn upscale_to_min_width(source: (u32, u32), min_width: u32) -> Option<(u32, u32)> {
    let (w, h) = source;
    if w == 0 || w >= min_width {
        return None;
    }
    let height = (min_width as f64 * h as f64 / w as f64).round() as u32;
    Some((min_width, height.max(1)))
}
