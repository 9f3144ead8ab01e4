//! Text recognition through an injected OCR engine.

#[cfg(feature = "native")]
mod pure_engine;
#[cfg(feature = "tesseract")]
mod tesseract;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrBackend;
#[cfg(feature = "tesseract")]
pub use tesseract::TesseractBackend;

use std::fmt;
use std::time::Instant;

use tracing::debug;

use crate::error::OcrError;
use crate::normalize::NormalizedImage;

/// An OCR engine that turns an image into plain text.
pub trait OcrBackend {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Recognize all text in the image, lines separated by `\n`.
    fn image_to_text(&self, image: &NormalizedImage) -> Result<String, OcrError>;
}

impl<B: OcrBackend + ?Sized> OcrBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn image_to_text(&self, image: &NormalizedImage) -> Result<String, OcrError> {
        (**self).image_to_text(image)
    }
}

impl<B: OcrBackend + ?Sized> OcrBackend for &B {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn image_to_text(&self, image: &NormalizedImage) -> Result<String, OcrError> {
        (**self).image_to_text(image)
    }
}

/// Verbatim engine output for one normalized image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognizedText(String);

impl RecognizedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RecognizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Runs the configured OCR engine on normalized images.
pub struct TextRecognizer<B: OcrBackend> {
    backend: B,
}

impl<B: OcrBackend> TextRecognizer<B> {
    /// Create a recognizer around an engine.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Recognize text. No retry and no post-processing.
    pub fn recognize(&self, image: &NormalizedImage) -> Result<RecognizedText, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        let text = self.backend.image_to_text(image)?;

        debug!(
            "{} recognized {} chars from {}x{} in {}ms",
            self.backend.name(),
            text.len(),
            width,
            height,
            start.elapsed().as_millis()
        );

        Ok(RecognizedText(text))
    }
}
