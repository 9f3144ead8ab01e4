//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the fieldscan pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Image normalization configuration.
    pub normalize: NormalizeConfig,

    /// PDF rasterization configuration.
    pub pdf: PdfConfig,

    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Live capture configuration.
    pub capture: CaptureConfig,

    /// Output configuration.
    pub output: OutputConfig,
}

/// Image normalization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Apply the fixed 1 degree rotation after contrast stretching.
    pub augment: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self { augment: true }
    }
}

/// How PDF pages become images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfRendererKind {
    /// pdfium when its library can be loaded, embedded images otherwise.
    Auto,
    /// Render pages with pdfium; fail if the library is missing.
    Pdfium,
    /// Take the largest embedded image of each page (lopdf).
    Embedded,
}

/// PDF rasterization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    pub renderer: PdfRendererKind,

    /// Render resolution in dots per inch.
    pub dpi: u32,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            renderer: PdfRendererKind::Auto,
            dpi: 200,
        }
    }
}

/// Which OCR engine backs the text recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackendKind {
    /// ONNX models through `pure-onnx-ocr`.
    Onnx,
    /// Tesseract through `leptess`.
    Tesseract,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Engine to use.
    pub backend: OcrBackendKind,

    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Tesseract language.
    pub language: String,

    /// Base URL the model files are downloaded from.
    pub model_base_url: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackendKind::Onnx,
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            language: "eng".to_string(),
            model_base_url: None,
        }
    }
}

impl OcrConfig {
    /// Model files required by the ONNX backend, in load order.
    pub fn model_files(&self) -> [&str; 3] {
        [
            self.detection_model.as_str(),
            self.recognition_model.as_str(),
            self.dictionary.as_str(),
        ]
    }
}

/// Live capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// ffmpeg executable.
    pub ffmpeg_path: String,

    /// ffmpeg input format (`v4l2`, `avfoundation`, `dshow`).
    pub input_format: String,

    /// Device passed to ffmpeg `-i`.
    pub device: String,

    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// Directory the saved frame is written to.
    pub output_dir: PathBuf,

    /// File name of the saved frame.
    pub frame_filename: String,

    /// Show live frames in an `ffplay` window.
    pub preview: bool,

    /// ffplay executable used for the preview window.
    pub ffplay_path: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            input_format: "v4l2".to_string(),
            device: "/dev/video0".to_string(),
            width: 640,
            height: 480,
            output_dir: PathBuf::from("captured_images"),
            frame_filename: "captured_frame.jpg".to_string(),
            preview: true,
            ffplay_path: "ffplay".to_string(),
        }
    }
}

impl CaptureConfig {
    /// Full path of the saved frame.
    pub fn frame_path(&self) -> PathBuf {
        self.output_dir.join(&self.frame_filename)
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default JSON output file.
    pub json_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_path: PathBuf::from("invoice_data.json"),
        }
    }
}

impl ScanConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
