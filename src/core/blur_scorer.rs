//! Laplacian-variance blur scoring
//!
//! The Laplacian responds to edges, so a sharp image produces a response map
//! with high variance and a blurry one a flat map. The raw variance is the
//! score; interpreting it is left to the caller.

use image::{DynamicImage, GrayImage, ImageReader, Luma};
use std::path::Path;

use crate::error::ItemError;

/// Decode an image file and compute its blur score
pub fn score_file(path: &Path) -> Result<f64, ItemError> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(score_image(&image))
}

/// Variance of the Laplacian of the grayscale image
pub fn score_image(image: &DynamicImage) -> f64 {
    laplacian_variance(&to_gray_bt601(image))
}

/// Grayscale conversion with BT.601 weights (0.299 R + 0.587 G + 0.114 B)
///
/// `DynamicImage::to_luma8` uses BT.709 weights, which shifts scores
/// relative to the usual computer-vision convention.
pub fn to_gray_bt601(image: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return gray.clone();
    }
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Population variance of the 4-neighbour Laplacian `[0 1 0; 1 -4 1; 0 1 0]`
///
/// Every pixel contributes; neighbours outside the image are mirrored
/// without repeating the edge pixel (reflect-101).
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }

    let w = width as i64;
    let h = height as i64;
    let at = |x: i64, y: i64| -> f64 {
        let x = reflect_101(x, w) as u32;
        let y = reflect_101(y, h) as u32;
        f64::from(gray.get_pixel(x, y)[0])
    };

    let n = (w * h) as f64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 0..h {
        for x in 0..w {
            let v = at(x, y - 1) + at(x, y + 1) + at(x - 1, y) + at(x + 1, y) - 4.0 * at(x, y);
            sum += v;
            sum_sq += v * v;
        }
    }

    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

fn reflect_101(i: i64, len: i64) -> i64 {
    if len == 1 {
        return 0;
    }
    let mut i = i;
    while i < 0 || i >= len {
        if i < 0 {
            i = -i;
        } else {
            i = 2 * (len - 1) - i;
        }
    }
    i
}
