//! Local background removal by border flood fill.
//!
//! The background colour is the per-channel median of the four corner
//! pixels. Starting from every border pixel, connected pixels whose RGB
//! channels all lie within `tolerance` of that colour become fully
//! transparent. Subjects touching the border keep their pixels as long as
//! they differ from the background.

use image::{Rgba, RgbaImage};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CutoutError {
    #[error("no background found at the image border")]
    NothingRemoved,
    #[error("whole image matched the background colour")]
    EverythingRemoved,
    #[error("image is empty")]
    Empty,
}

/// Per-channel median of the four corners (mean of the middle two values).
pub fn background_colour(img: &RgbaImage) -> [u8; 3] {
    let (w, h) = img.dimensions();
    let corners = [
        img.get_pixel(0, 0),
        img.get_pixel(w - 1, 0),
        img.get_pixel(0, h - 1),
        img.get_pixel(w - 1, h - 1),
    ];
    let mut out = [0u8; 3];
    for (c, slot) in out.iter_mut().enumerate() {
        let mut values = corners.map(|p| p.0[c]);
        values.sort_unstable();
        *slot = ((values[1] as u16 + values[2] as u16) / 2) as u8;
    }
    out
}

fn matches(pixel: &Rgba<u8>, reference: [u8; 3], tolerance: u8) -> bool {
    pixel.0[..3]
        .iter()
        .zip(reference)
        .all(|(&p, r)| p.abs_diff(r) <= tolerance)
}

/// Make the border-connected background transparent. Returns the number of
/// pixels removed.
pub fn remove_background(img: &mut RgbaImage, tolerance: u8) -> Result<usize, CutoutError> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(CutoutError::Empty);
    }
    let reference = background_colour(img);
    let total = (w as usize) * (h as usize);
    let mut visited = vec![false; total];
    let mut queue = VecDeque::new();

    let border = (0..w)
        .flat_map(|x| [(x, 0), (x, h - 1)])
        .chain((0..h).flat_map(|y| [(0, y), (w - 1, y)]));
    for (x, y) in border {
        let idx = (y * w + x) as usize;
        if !visited[idx] && matches(img.get_pixel(x, y), reference, tolerance) {
            visited[idx] = true;
            queue.push_back((x, y));
        }
    }

    let mut removed = 0;
    while let Some((x, y)) = queue.pop_front() {
        img.get_pixel_mut(x, y).0[3] = 0;
        removed += 1;

        let neighbours = [
            (x.checked_sub(1), Some(y)),
            (x.checked_add(1).filter(|&nx| nx < w), Some(y)),
            (Some(x), y.checked_sub(1)),
            (Some(x), y.checked_add(1).filter(|&ny| ny < h)),
        ];
        for (nx, ny) in neighbours {
            let (Some(nx), Some(ny)) = (nx, ny) else {
                continue;
            };
            let idx = (ny * w + nx) as usize;
            if !visited[idx] && matches(img.get_pixel(nx, ny), reference, tolerance) {
                visited[idx] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    match removed {
        0 => Err(CutoutError::NothingRemoved),
        n if n == total => Err(CutoutError::EverythingRemoved),
        n => Ok(n),
    }
}

/// Composite onto an opaque matte colour.
pub fn flatten(img: &RgbaImage, matte: [u8; 3]) -> RgbaImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        let alpha = pixel.0[3] as u32;
        for c in 0..3 {
            let fg = pixel.0[c] as u32;
            let bg = matte[c] as u32;
            pixel.0[c] = ((fg * alpha + bg * (255 - alpha) + 127) / 255) as u8;
        }
        pixel.0[3] = 255;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10x10 grey background with a red 4x4 square in the middle.
    fn product_on_grey() -> RgbaImage {
        RgbaImage::from_fn(10, 10, |x, y| {
            if (3..7).contains(&x) && (3..7).contains(&y) {
                Rgba([200, 20, 20, 255])
            } else {
                Rgba([240, 240, 238, 255])
            }
        })
    }

    #[test]
    fn background_is_median_of_corners() {
        let mut img = product_on_grey();
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        assert_eq!(background_colour(&img), [240, 240, 238]);
    }

    #[test]
    fn removes_border_connected_background_only() {
        let mut img = product_on_grey();
        let removed = remove_background(&mut img, 16).unwrap();
        assert_eq!(removed, 100 - 16);
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
        assert_eq!(img.get_pixel(5, 5).0, [200, 20, 20, 255]);
    }

    #[test]
    fn enclosed_background_coloured_pixels_survive() {
        let mut img = product_on_grey();
        // A hole inside the product with the background colour.
        img.put_pixel(4, 4, Rgba([240, 240, 238, 255]));
        remove_background(&mut img, 16).unwrap();
        assert_eq!(img.get_pixel(4, 4).0[3], 255);
    }

    #[test]
    fn busy_border_removes_nothing() {
        let mut checker = RgbaImage::from_fn(8, 8, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        // Two black and two white corners: the median is mid grey, matching neither.
        assert_eq!(remove_background(&mut checker, 10), Err(CutoutError::NothingRemoved));
    }

    #[test]
    fn uniform_image_is_everything_removed() {
        let mut img = RgbaImage::from_pixel(6, 6, Rgba([255, 255, 255, 255]));
        assert_eq!(remove_background(&mut img, 8), Err(CutoutError::EverythingRemoved));
    }

    #[test]
    fn flatten_composites_onto_matte() {
        let mut img = product_on_grey();
        remove_background(&mut img, 16).unwrap();
        let flat = flatten(&img, [255, 255, 255]);
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(flat.get_pixel(5, 5).0, [200, 20, 20, 255]);
    }
}
