//! Contrast normalization for cleaned logos.
//!
//! Luminance is measured per pixel, the darkest and brightest `clip` fraction
//! are ignored, and every channel is stretched linearly so the remaining
//! luminance range covers 0–255.

use image::RgbImage;

/// Fraction of pixels ignored at each end of the luminance histogram.
pub const DEFAULT_CLIP: f64 = 0.01;

fn luma(p: &[u8]) -> usize {
    (299 * p[0] as usize + 587 * p[1] as usize + 114 * p[2] as usize) / 1000
}

/// Luminance bounds `(low, high)` after clipping `clip` of the pixels at each
/// end.
pub fn luminance_bounds(img: &RgbImage, clip: f64) -> (u8, u8) {
    let mut histogram = [0usize; 256];
    for pixel in img.pixels() {
        histogram[luma(&pixel.0)] += 1;
    }
    let total = (img.width() as usize) * (img.height() as usize);
    let skip = (total as f64 * clip).floor() as usize;

    let mut seen = 0;
    let mut low = 0;
    for (value, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen > skip {
            low = value;
            break;
        }
    }
    seen = 0;
    let mut high = 255;
    for (value, &count) in histogram.iter().enumerate().rev() {
        seen += count;
        if seen > skip {
            high = value;
            break;
        }
    }
    (low as u8, high as u8)
}

/// Stretch the levels of `img` in place. Returns `false` and leaves the image
/// untouched when its luminance range is empty.
pub fn stretch(img: &mut RgbImage, clip: f64) -> bool {
    let (low, high) = luminance_bounds(img, clip);
    if high <= low {
        return false;
    }
    let (low, span) = (low as u32, (high - low) as u32);
    for pixel in img.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            let shifted = (*channel as u32).saturating_sub(low);
            *channel = ((shifted * 255 + span / 2) / span).min(255) as u8;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Grey ramp from 100 to 150, one column per value.
    fn dull_ramp() -> RgbImage {
        RgbImage::from_fn(51, 4, |x, _| {
            let v = 100 + x as u8;
            Rgb([v, v, v])
        })
    }

    #[test]
    fn bounds_of_ramp() {
        assert_eq!(luminance_bounds(&dull_ramp(), DEFAULT_CLIP), (100, 150));
    }

    #[test]
    fn stretch_spans_full_range() {
        let mut img = dull_ramp();
        assert!(stretch(&mut img, DEFAULT_CLIP));
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(50, 0).0, [255, 255, 255]);
        let mid = img.get_pixel(25, 0).0[0];
        assert!((126..=129).contains(&mid), "{mid}");
    }

    #[test]
    fn clipping_ignores_stray_pixels() {
        let mut img = RgbImage::from_fn(100, 10, |x, _| {
            let v = if x < 50 { 80 } else { 160 };
            Rgb([v, v, v])
        });
        img.put_pixel(0, 0, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([255, 255, 255]));
        assert_eq!(luminance_bounds(&img, DEFAULT_CLIP), (80, 160));
    }

    #[test]
    fn flat_image_is_left_alone() {
        let mut img = RgbImage::from_pixel(8, 8, Rgb([200, 200, 200]));
        assert!(!stretch(&mut img, DEFAULT_CLIP));
        assert_eq!(img.get_pixel(3, 3).0, [200, 200, 200]);
    }
}
