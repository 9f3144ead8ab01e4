//! Subcommand implementations.

pub mod batch;
pub mod capture;
pub mod config;
pub mod models;
pub mod parse;
pub mod process;
pub mod render;

use fieldscan_core::models::config::OcrBackendKind;
use fieldscan_core::{OcrBackend, ScanConfig};

/// Build the OCR engine selected in the configuration.
pub fn build_backend(config: &ScanConfig) -> anyhow::Result<Box<dyn OcrBackend>> {
    match config.ocr.backend {
        OcrBackendKind::Onnx => {
            let backend = fieldscan_core::PureOcrBackend::from_dir(&config.ocr.model_dir, &config.ocr)
                .map_err(|e| {
                    anyhow::anyhow!(
                        "{}\n\nRun 'fieldscan models status' to check the model directory.",
                        e
                    )
                })?;
            Ok(Box::new(backend))
        }
        OcrBackendKind::Tesseract => tesseract_backend(config),
    }
}

#[cfg(feature = "tesseract")]
fn tesseract_backend(config: &ScanConfig) -> anyhow::Result<Box<dyn OcrBackend>> {
    let backend = fieldscan_core::TesseractBackend::new(&config.ocr.language)?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "tesseract"))]
fn tesseract_backend(_config: &ScanConfig) -> anyhow::Result<Box<dyn OcrBackend>> {
    anyhow::bail!("fieldscan was built without the 'tesseract' feature")
}
