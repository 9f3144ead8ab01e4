//! Core library for document field extraction.
//!
//! This crate provides:
//! - Image normalization (grayscale, bilateral denoise, 2x upscale, contrast stretch)
//! - Text recognition through an injected OCR backend
//! - Line-oriented field parsing (invoice number, order number, date, total)
//! - Source adapters for PDFs, still images and live capture devices

pub mod capture;
pub mod error;
pub mod fields;
pub mod models;
pub mod normalize;
pub mod ocr;
pub mod output;
pub mod pdf;
pub mod pipeline;

pub use error::{CaptureError, InputError, OcrError, PdfError, Result, ScanError};
pub use fields::{select_field, FieldParser, FieldSelection, LineFieldParser};
pub use models::config::ScanConfig;
pub use models::record::{ExtractionResult, FieldName, FieldRecord};
pub use normalize::{ImageNormalizer, NormalizedImage, RawImage};
pub use ocr::{OcrBackend, RecognizedText, TextRecognizer};
pub use output::{save_to_json, to_json_string};
pub use pdf::{LopdfRasterizer, PageRasterizer, PdfRasterizer};
pub use pipeline::{DocumentScanner, Pipeline};

#[cfg(feature = "native")]
pub use ocr::PureOcrBackend;

#[cfg(feature = "tesseract")]
pub use ocr::TesseractBackend;

#[cfg(feature = "pdfium")]
pub use pdf::PdfiumRasterizer;
