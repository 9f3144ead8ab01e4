//! Image normalization ahead of text recognition.

mod filters;

use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbImage};
use tracing::debug;

use crate::error::InputError;

/// Neighborhood diameter of the bilateral filter.
const BILATERAL_DIAMETER: u32 = 9;
/// Intensity sigma of the bilateral filter.
const BILATERAL_SIGMA_COLOR: f32 = 75.0;
/// Spatial sigma of the bilateral filter.
const BILATERAL_SIGMA_SPACE: f32 = 75.0;
/// Upscale factor applied on both axes.
const SCALE_FACTOR: u32 = 2;
/// Augmentation rotation, counter-clockwise.
const AUGMENT_DEGREES: f32 = 1.0;

/// A decoded 3-channel page or frame with non-zero dimensions.
#[derive(Debug, Clone)]
pub struct RawImage {
    pixels: RgbImage,
}

impl RawImage {
    /// Wrap an RGB buffer, rejecting zero-dimension images.
    pub fn new(pixels: RgbImage) -> Result<Self, InputError> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(InputError::EmptyImage { width, height });
        }
        Ok(Self { pixels })
    }

    /// Convert any decoded image to RGB.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self, InputError> {
        Self::new(image.to_rgb8())
    }

    /// Decode an image from encoded bytes, guessing the format.
    pub fn from_bytes(data: &[u8]) -> Result<Self, InputError> {
        Self::from_dynamic(image::load_from_memory(data)?)
    }

    /// Read and decode an image file.
    pub fn open(path: &Path) -> Result<Self, InputError> {
        let data = std::fs::read(path).map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&data)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.pixels
    }
}

/// A grayscale, upscaled, contrast-stretched image ready for OCR.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    pixels: GrayImage,
}

impl NormalizedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.pixels
    }

    /// The image as a `DynamicImage` for engines that take one.
    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageLuma8(self.pixels.clone())
    }

    /// Encode the image as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut data = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut data), image::ImageFormat::Png)?;
        Ok(data)
    }
}

/// Converts raw color pages into OCR-friendly grayscale images.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageNormalizer;

impl ImageNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Run grayscale, denoise, upscale, contrast stretch and, if `augment`, a 1 degree rotation.
    pub fn normalize(&self, image: &RawImage, augment: bool) -> NormalizedImage {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        let gray = filters::to_luma(image.as_rgb());
        let denoised = filters::bilateral_filter(
            &gray,
            BILATERAL_DIAMETER,
            BILATERAL_SIGMA_COLOR,
            BILATERAL_SIGMA_SPACE,
        );

        let mut resized = image::imageops::resize(
            &denoised,
            width * SCALE_FACTOR,
            height * SCALE_FACTOR,
            FilterType::Triangle,
        );

        filters::stretch_min_max(&mut resized);

        let pixels = if augment {
            filters::rotate_ccw(&resized, AUGMENT_DEGREES)
        } else {
            resized
        };

        debug!(
            "Normalized {}x{} -> {}x{} (augment={}) in {}ms",
            width,
            height,
            pixels.width(),
            pixels.height(),
            augment,
            start.elapsed().as_millis()
        );

        NormalizedImage { pixels }
    }
}
