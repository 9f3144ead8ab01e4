//! OCR backend using `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).

use std::path::Path;

use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::OcrConfig;
use crate::normalize::NormalizedImage;

use super::OcrBackend;

/// Regions whose top edges are within this many pixels share a row.
const ROW_HEIGHT: f32 = 20.0;

/// OCR engine backed by `pure-onnx-ocr` detection and recognition models.
pub struct PureOcrBackend {
    engine: pure_onnx_ocr::engine::OcrEngine,
}

impl PureOcrBackend {
    /// Create an engine from the model files named in `config`, found in `model_dir`.
    pub fn from_dir(model_dir: &Path, config: &OcrConfig) -> Result<Self, OcrError> {
        let det_path = model_dir.join(&config.detection_model);
        let rec_path = model_dir.join(&config.recognition_model);
        let dict_path = model_dir.join(&config.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "missing model file {}",
                    path.display()
                )));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self { engine })
    }
}

impl OcrBackend for PureOcrBackend {
    fn name(&self) -> &str {
        "pure-onnx-ocr"
    }

    fn image_to_text(&self, image: &NormalizedImage) -> Result<String, OcrError> {
        let results = self
            .engine
            .run_from_image(&image.to_dynamic())
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        let regions = results
            .iter()
            .map(|r| {
                let (x, y) = top_left(&r.bounding_box);
                (x, y, r.text.clone())
            })
            .collect();

        Ok(join_in_reading_order(regions))
    }
}

/// Top-left corner of the region's axis-aligned bounds.
fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f32, f32) {
    polygon
        .exterior()
        .coords()
        .take(4)
        .fold((f32::INFINITY, f32::INFINITY), |(x, y), c| {
            (x.min(c.x as f32), y.min(c.y as f32))
        })
}

/// Sort regions top-to-bottom then left-to-right and join them one per line.
fn join_in_reading_order(mut regions: Vec<(f32, f32, String)>) -> String {
    regions.sort_by(|a, b| {
        let row_a = (a.1 / ROW_HEIGHT) as i32;
        let row_b = (b.1 / ROW_HEIGHT) as i32;
        if row_a != row_b {
            row_a.cmp(&row_b)
        } else {
            a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal)
        }
    });

    regions
        .into_iter()
        .map(|(_, _, text)| text)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reading_order() {
        let regions = vec![
            (300.0, 82.0, "Total: 10".to_string()),
            (40.0, 5.0, "Invoice #: 9".to_string()),
            (10.0, 85.0, "Subtotal".to_string()),
            (200.0, 12.0, "Date: today".to_string()),
        ];

        assert_eq!(
            join_in_reading_order(regions),
            "Invoice #: 9\nDate: today\nSubtotal\nTotal: 10"
        );
    }

    #[test]
    fn test_missing_models() {
        let dir = tempfile::tempdir().unwrap();
        let result = PureOcrBackend::from_dir(dir.path(), &OcrConfig::default());
        assert!(matches!(result, Err(OcrError::ModelLoad(_))));
    }
}
