//! OCR backend using Tesseract through `leptess`.

use leptess::LepTess;
use tracing::{debug, info};

use crate::error::OcrError;
use crate::normalize::NormalizedImage;

use super::OcrBackend;

/// Tesseract with its default engine and page segmentation settings.
pub struct TesseractBackend {
    language: String,
}

impl TesseractBackend {
    /// Verify Tesseract can initialize with `language` and keep it for later calls.
    pub fn new(language: &str) -> Result<Self, OcrError> {
        LepTess::new(None, language).map_err(|e| {
            OcrError::ModelLoad(format!(
                "failed to initialize Tesseract with language '{}': {}",
                language, e
            ))
        })?;

        info!("Initialized Tesseract with language {}", language);

        Ok(Self {
            language: language.to_string(),
        })
    }
}

impl OcrBackend for TesseractBackend {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn image_to_text(&self, image: &NormalizedImage) -> Result<String, OcrError> {
        let mut lt = LepTess::new(None, &self.language)
            .map_err(|e| OcrError::ModelLoad(format!("failed to initialize Tesseract: {}", e)))?;

        // leptess decodes the image itself.
        let png = image
            .to_png()
            .map_err(|e| OcrError::InvalidImage(format!("failed to encode PNG: {}", e)))?;

        lt.set_image_from_mem(&png)
            .map_err(|e| OcrError::Recognition(format!("failed to set image: {}", e)))?;

        let text = lt
            .get_utf8_text()
            .map_err(|e| OcrError::Recognition(format!("invalid UTF-8 from Tesseract: {}", e)))?;

        debug!("Tesseract returned {} chars", text.len());
        Ok(text)
    }
}
