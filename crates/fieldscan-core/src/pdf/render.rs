//! Page rendering with pdfium.

use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, trace};

use super::{PdfRasterizer, Result};
use crate::error::PdfError;

/// PDF points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Renders every page to a bitmap, whatever the page is made of.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
    dpi: u32,
}

impl std::fmt::Debug for PdfiumRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumRasterizer")
            .field("dpi", &self.dpi)
            .finish()
    }
}

impl PdfiumRasterizer {
    /// Bind the pdfium library next to the executable, or the system one.
    pub fn new(dpi: u32) -> Result<Self> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| PdfError::Renderer(format!("failed to bind pdfium library: {}", e)))?;

        debug!("Bound pdfium, rendering at {} dpi", dpi);

        Ok(Self {
            pdfium: Pdfium::new(bindings),
            dpi: dpi.max(1),
        })
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    fn render_page(&self, page: &PdfPage, number: usize) -> Result<DynamicImage> {
        let scale = self.dpi as f32 / POINTS_PER_INCH;
        let width = ((page.width().value * scale).round() as i32).max(1);
        let height = ((page.height().value * scale).round() as i32).max(1);

        trace!("Rendering page {} at {}x{}", number, width, height);

        let bitmap = page
            .render_with_config(
                &PdfRenderConfig::new()
                    .set_target_width(width)
                    .set_target_height(height)
                    .render_form_data(true)
                    .render_annotations(true),
            )
            .map_err(|e| {
                PdfError::ImageExtraction(format!("failed to render page {}: {}", number, e))
            })?;

        Ok(bitmap.as_image())
    }
}

impl PdfRasterizer for PdfiumRasterizer {
    fn rasterize(&self, data: &[u8]) -> Result<Vec<DynamicImage>> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(data, None)
            .map_err(|e| match e {
                PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
                    PdfError::Encrypted
                }
                other => PdfError::Parse(other.to_string()),
            })?;

        let page_count = document.pages().len() as usize;
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Rendering {} pages", page_count);

        document
            .pages()
            .iter()
            .enumerate()
            .map(|(index, page)| self.render_page(&page, index + 1))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{build_pdf, build_text_pdf};
    use image::GenericImageView;
    use pretty_assertions::assert_eq;

    /// pdfium is a shared library that may be absent on the test host.
    fn rasterizer(dpi: u32) -> Option<PdfiumRasterizer> {
        match PdfiumRasterizer::new(dpi) {
            Ok(rasterizer) => Some(rasterizer),
            Err(e) => {
                eprintln!("skipping: {}", e);
                None
            }
        }
    }

    #[test]
    fn test_text_only_page_is_rendered() {
        let Some(rasterizer) = rasterizer(72) else {
            return;
        };

        let pages = rasterizer.rasterize(&build_text_pdf("Invoice #: INV-1")).unwrap();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].dimensions(), (200, 100));
        let gray = pages[0].to_luma8();
        let darkest = gray.pixels().map(|p| p[0]).min().unwrap();
        assert!(darkest < 128, "text should leave dark pixels");
    }

    #[test]
    fn test_page_size_follows_dpi() {
        let Some(rasterizer) = rasterizer(144) else {
            return;
        };

        let data = build_pdf(&[vec![(40, 30, 0)], vec![(50, 30, 0)]]);
        let sizes: Vec<_> = rasterizer
            .rasterize(&data)
            .unwrap()
            .iter()
            .map(|page| page.dimensions())
            .collect();

        assert_eq!(sizes, vec![(80, 60), (100, 60)]);
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let Some(rasterizer) = rasterizer(72) else {
            return;
        };

        assert!(matches!(
            rasterizer.rasterize(b"definitely not a pdf"),
            Err(PdfError::Parse(_))
        ));
    }
}
