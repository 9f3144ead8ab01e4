//! Data models for field extraction.

pub mod config;
pub mod record;

pub use config::{
    CaptureConfig, NormalizeConfig, OcrBackendKind, OcrConfig, OutputConfig, PdfConfig,
    PdfRendererKind, ScanConfig,
};
pub use record::{ExtractionResult, FieldName, FieldRecord};
