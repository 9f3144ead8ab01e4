//! PDF rasterization module.
//!
//! Pages are rendered with pdfium when its library is available. Otherwise
//! each page's largest embedded image is decoded with lopdf.

mod extractor;
#[cfg(feature = "pdfium")]
mod render;

pub use extractor::LopdfRasterizer;
#[cfg(feature = "pdfium")]
pub use render::PdfiumRasterizer;

#[cfg(test)]
pub(crate) use extractor::tests::{build_pdf, build_text_pdf};

use crate::error::PdfError;
use crate::models::config::{PdfConfig, PdfRendererKind};
use image::DynamicImage;
use tracing::warn;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for turning a PDF into one image per page.
pub trait PdfRasterizer {
    /// Rasterize every page, in page order.
    fn rasterize(&self, data: &[u8]) -> Result<Vec<DynamicImage>>;
}

impl<R: PdfRasterizer + ?Sized> PdfRasterizer for &R {
    fn rasterize(&self, data: &[u8]) -> Result<Vec<DynamicImage>> {
        (**self).rasterize(data)
    }
}

/// The rasterizer picked by [`PdfConfig`].
#[derive(Debug)]
pub enum PageRasterizer {
    #[cfg(feature = "pdfium")]
    Rendered(PdfiumRasterizer),
    Embedded(LopdfRasterizer),
}

impl PageRasterizer {
    pub fn from_config(config: &PdfConfig) -> Result<Self> {
        match config.renderer {
            PdfRendererKind::Auto => Ok(Self::auto(config.dpi)),
            PdfRendererKind::Pdfium => Self::pdfium(config.dpi),
            PdfRendererKind::Embedded => Ok(Self::Embedded(LopdfRasterizer::new())),
        }
    }

    /// pdfium if it can be bound, embedded images otherwise.
    pub fn auto(dpi: u32) -> Self {
        match Self::pdfium(dpi) {
            Ok(rasterizer) => rasterizer,
            Err(e) => {
                warn!("{}; only embedded page images will be read", e);
                Self::Embedded(LopdfRasterizer::new())
            }
        }
    }

    #[cfg(feature = "pdfium")]
    fn pdfium(dpi: u32) -> Result<Self> {
        let rasterizer = PdfiumRasterizer::new(dpi)?;
        tracing::info!("Rendering PDF pages with pdfium at {} dpi", dpi);
        Ok(Self::Rendered(rasterizer))
    }

    #[cfg(not(feature = "pdfium"))]
    fn pdfium(_dpi: u32) -> Result<Self> {
        Err(PdfError::Renderer("built without pdfium support".to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "pdfium")]
            Self::Rendered(_) => "pdfium",
            Self::Embedded(_) => "embedded",
        }
    }
}

impl Default for PageRasterizer {
    fn default() -> Self {
        Self::auto(PdfConfig::default().dpi)
    }
}

impl PdfRasterizer for PageRasterizer {
    fn rasterize(&self, data: &[u8]) -> Result<Vec<DynamicImage>> {
        match self {
            #[cfg(feature = "pdfium")]
            Self::Rendered(rasterizer) => rasterizer.rasterize(data),
            Self::Embedded(rasterizer) => rasterizer.rasterize(data),
        }
    }
}
