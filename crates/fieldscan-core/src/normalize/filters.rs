//! Pixel-level filters used by the normalizer.

use image::{GrayImage, Luma, RgbImage};
use imageproc::geometric_transformations::{rotate, Interpolation};

/// Convert RGB to grayscale with BT.601 luma weights.
pub(crate) fn to_luma(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut gray = GrayImage::new(width, height);

    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000;
        gray.put_pixel(x, y, Luma([luma.min(255) as u8]));
    }

    gray
}

/// Edge-preserving bilateral smoothing over a circular window.
///
/// Weights are `exp(-d²/2σs²) * exp(-Δ²/2σc²)`; borders reflect without
/// repeating the edge sample.
pub(crate) fn bilateral_filter(
    image: &GrayImage,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> GrayImage {
    let (width, height) = image.dimensions();
    let radius = (diameter / 2) as i64;

    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);

    let color_weights: Vec<f32> = (0..256u32)
        .map(|delta| ((delta * delta) as f32 * color_coeff).exp())
        .collect();

    let mut kernel = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let dist_sq = (dx * dx + dy * dy) as f32;
            if dist_sq.sqrt() > radius as f32 {
                continue;
            }
            kernel.push((dx, dy, (dist_sq * space_coeff).exp()));
        }
    }

    let mut result = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let center = image.get_pixel(x, y)[0];
            let mut sum = 0.0f32;
            let mut weight_sum = 0.0f32;

            for &(dx, dy, space_weight) in &kernel {
                let sx = reflect_101(x as i64 + dx, width);
                let sy = reflect_101(y as i64 + dy, height);
                let value = image.get_pixel(sx, sy)[0];

                let delta = (value as i16 - center as i16).unsigned_abs() as usize;
                let weight = space_weight * color_weights[delta];

                sum += weight * value as f32;
                weight_sum += weight;
            }

            let smoothed = (sum / weight_sum).round().clamp(0.0, 255.0) as u8;
            result.put_pixel(x, y, Luma([smoothed]));
        }
    }

    result
}

/// Map an out-of-range index back into `0..len` by mirroring (`gfedcb|abcdefgh|gfedcba`).
fn reflect_101(index: i64, len: u32) -> u32 {
    let len = len as i64;
    if len <= 1 {
        return 0;
    }

    let period = 2 * (len - 1);
    let mut i = index.rem_euclid(period);
    if i >= len {
        i = period - i;
    }
    i as u32
}

/// Stretch intensities linearly so the minimum maps to 0 and the maximum to 255.
///
/// A uniform image has no range to stretch and becomes all zeros.
pub(crate) fn stretch_min_max(image: &mut GrayImage) {
    let (min, max) = image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    if max <= min {
        for pixel in image.pixels_mut() {
            pixel[0] = 0;
        }
        return;
    }

    let scale = 255.0 / (max - min) as f32;
    for pixel in image.pixels_mut() {
        let stretched = ((pixel[0] - min) as f32 * scale).round();
        pixel[0] = stretched.clamp(0.0, 255.0) as u8;
    }
}

/// Rotate counter-clockwise about the integer image center, keeping dimensions.
pub(crate) fn rotate_ccw(image: &GrayImage, degrees: f32) -> GrayImage {
    let center = ((image.width() / 2) as f32, (image.height() / 2) as f32);
    // imageproc rotates clockwise for positive angles.
    rotate(
        image,
        center,
        -degrees.to_radians(),
        Interpolation::Bilinear,
        Luma([0u8]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_luma_weights() {
        let mut image = RgbImage::new(3, 1);
        image.put_pixel(0, 0, Rgb([255, 0, 0]));
        image.put_pixel(1, 0, Rgb([0, 255, 0]));
        image.put_pixel(2, 0, Rgb([255, 255, 255]));

        let gray = to_luma(&image);
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
        assert_eq!(gray.get_pixel(1, 0)[0], 150);
        assert_eq!(gray.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-4, 5), 4);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(2, 5), 2);
        assert_eq!(reflect_101(-3, 1), 0);
    }

    #[test]
    fn test_bilateral_keeps_flat_regions() {
        let image = GrayImage::from_pixel(12, 7, Luma([90]));
        let filtered = bilateral_filter(&image, 9, 75.0, 75.0);
        assert!(filtered.pixels().all(|p| p[0] == 90));
    }

    #[test]
    fn test_bilateral_preserves_strong_edge() {
        let mut image = GrayImage::from_pixel(20, 20, Luma([0]));
        for y in 0..20 {
            for x in 10..20 {
                image.put_pixel(x, y, Luma([255]));
            }
        }

        let filtered = bilateral_filter(&image, 9, 75.0, 75.0);
        assert!(filtered.get_pixel(2, 10)[0] < 20);
        assert!(filtered.get_pixel(17, 10)[0] > 235);
    }

    #[test]
    fn test_stretch_full_range() {
        let mut image = GrayImage::from_raw(3, 1, vec![100, 120, 150]).unwrap();
        stretch_min_max(&mut image);
        assert_eq!(image.into_raw(), vec![0, 102, 255]);
    }

    #[test]
    fn test_stretch_uniform_is_zero() {
        let mut image = GrayImage::from_pixel(4, 4, Luma([77]));
        stretch_min_max(&mut image);
        assert!(image.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_rotate_keeps_dimensions() {
        let image = GrayImage::from_pixel(40, 30, Luma([200]));
        let rotated = rotate_ccw(&image, 1.0);
        assert_eq!(rotated.dimensions(), (40, 30));
        assert_eq!(rotated.get_pixel(20, 15)[0], 200);
    }
}
