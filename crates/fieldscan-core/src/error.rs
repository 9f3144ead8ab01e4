//! Error types for the fieldscan-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the fieldscan library.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The source file cannot be read or decoded as an image or PDF.
    #[error("input unreadable: {0}")]
    InputUnreadable(#[from] InputError),

    /// The OCR engine cannot be invoked.
    #[error("recognition unavailable: {0}")]
    RecognitionUnavailable(#[from] OcrError),

    /// The video source cannot be opened.
    #[error("capture unavailable: {0}")]
    CaptureUnavailable(#[from] CaptureError),

    /// I/O error while writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error while writing output.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<PdfError> for ScanError {
    fn from(err: PdfError) -> Self {
        ScanError::InputUnreadable(InputError::Pdf(err))
    }
}

/// Errors raised while loading an input document.
#[derive(Error, Debug)]
pub enum InputError {
    /// The file could not be read from disk.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes could not be decoded as an image.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The PDF could not be rasterized.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// The image has a zero dimension.
    #[error("empty image ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

/// Errors related to PDF rasterization.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// A page carries no raster content that can be decoded.
    #[error("failed to extract page image: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// The page renderer could not be loaded.
    #[error("PDF renderer unavailable: {0}")]
    Renderer(String),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models or initialize the engine.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors related to live capture devices.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The device could not be opened.
    #[error("failed to open capture device: {0}")]
    Open(String),

    /// A frame could not be read.
    #[error("failed to grab frame: {0}")]
    Read(String),

    /// The device was used before `open` succeeded.
    #[error("capture device is not open")]
    NotOpen,
}

/// Result type for the fieldscan library.
pub type Result<T> = std::result::Result<T, ScanError>;
