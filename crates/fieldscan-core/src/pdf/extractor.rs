//! Page raster extraction using lopdf.
//!
//! Used when pdfium is unavailable. Scanned documents carry each page as an
//! image XObject; the largest decodable image on a page is taken as that
//! page's raster. Pages without one (text or vector only) cannot be
//! rasterized this way.

use image::{DynamicImage, GenericImageView, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{PdfRasterizer, Result};
use crate::error::PdfError;

/// PDF rasterizer reading embedded page images with lopdf.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfRasterizer;

impl LopdfRasterizer {
    pub fn new() -> Self {
        Self
    }

    fn load(&self, data: &[u8]) -> Result<Document> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        Ok(doc)
    }

    /// Decode every image XObject referenced by the page's resources.
    fn page_images(&self, doc: &Document, page: u32, page_id: ObjectId) -> Vec<DynamicImage> {
        let mut images = Vec::new();

        if let Some(resources) = self.get_page_resources(doc, page_id) {
            if let Ok(xobjects) = resources.get(b"XObject") {
                if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
                    for (_name, obj_ref) in xobj_dict.iter() {
                        if let Ok((_, obj)) = doc.dereference(obj_ref) {
                            if let Some(img) = self.try_extract_image_from_object(doc, obj) {
                                images.push(img);
                            }
                        }
                    }
                }
            }
        }

        trace!("Decoded {} images on page {}", images.len(), page);
        images
    }

    fn try_extract_image_from_object(&self, doc: &Document, obj: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = obj else {
            return None;
        };
        let dict = &stream.dict;

        if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
            return None;
        }

        let (Some(width), Some(height)) = (dimension(dict, b"Width"), dimension(dict, b"Height"))
        else {
            trace!("Skipping image with invalid dimensions");
            return None;
        };

        trace!("Found image object: {}x{}", width, height);

        if let Ok(filter) = dict.get(b"Filter") {
            let filter_name = match filter {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                _ => None,
            };

            match filter_name {
                Some(b"DCTDecode") => {
                    // JPEG data is usable as-is
                    return image::load_from_memory_with_format(
                        &stream.content,
                        image::ImageFormat::Jpeg,
                    )
                    .ok();
                }
                Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                    trace!("Skipping image with unsupported filter");
                    return None;
                }
                _ => {}
            }
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        let components = self.color_components(doc, dict.get(b"ColorSpace").ok())?;

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8);

        self.create_image_from_raw(&data, width, height, components, bits)
    }

    /// Color components per pixel, for color spaces that decode to gray or RGB.
    fn color_components(&self, doc: &Document, color_space: Option<&Object>) -> Option<usize> {
        let Some(color_space) = color_space else {
            return Some(3);
        };
        let (_, color_space) = doc.dereference(color_space).ok()?;

        match color_space {
            Object::Name(name) => match name.as_slice() {
                b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(3),
                b"DeviceGray" | b"G" | b"CalGray" => Some(1),
                other => {
                    trace!("Unsupported color space {}", String::from_utf8_lossy(other));
                    None
                }
            },
            Object::Array(arr) => match arr.first()?.as_name().ok()? {
                b"ICCBased" => {
                    let (_, profile) = doc.dereference(arr.get(1)?).ok()?;
                    let n = profile.as_stream().ok()?.dict.get(b"N").ok()?.as_i64().ok()?;
                    match n {
                        1 => Some(1),
                        3 => Some(3),
                        _ => None,
                    }
                }
                b"CalRGB" => Some(3),
                b"CalGray" => Some(1),
                other => {
                    trace!("Unsupported color space {}", String::from_utf8_lossy(other));
                    None
                }
            },
            _ => None,
        }
    }

    fn create_image_from_raw(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        components: usize,
        bits_per_component: i64,
    ) -> Option<DynamicImage> {
        let bits = usize::try_from(bits_per_component).ok()?;

        // Rows are padded to whole bytes
        let row_len = (width as usize)
            .checked_mul(components)?
            .checked_mul(bits)?
            .div_ceil(8);
        let expected = row_len.checked_mul(height as usize)?;

        if data.len() < expected {
            trace!(
                "Image data too short: {} bytes for {}x{}",
                data.len(),
                width,
                height
            );
            return None;
        }

        match (components, bits) {
            (3, 8) => RgbImage::from_raw(width, height, data[..expected].to_vec())
                .map(DynamicImage::ImageRgb8),
            (1, 8) => GrayImage::from_raw(width, height, data[..expected].to_vec())
                .map(DynamicImage::ImageLuma8),
            (1, 1) => {
                let pixels = data[..expected]
                    .chunks(row_len)
                    .flat_map(|row| {
                        (0..width as usize).map(move |x| {
                            if row[x / 8] & (0x80 >> (x % 8)) != 0 {
                                255
                            } else {
                                0
                            }
                        })
                    })
                    .collect();
                GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
            }
            _ => {
                trace!(
                    "Unsupported image layout: {} components at {} bits",
                    components,
                    bits
                );
                None
            }
        }
    }

    /// Get resources dictionary for a page, handling inheritance
    fn get_page_resources(&self, doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
        let Object::Dictionary(dict) = doc.get_object(page_id).ok()? else {
            return None;
        };

        if let Ok(resources) = dict.get(b"Resources") {
            if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
                return Some(res_dict.clone());
            }
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => self.get_page_resources(doc, *parent_id),
            _ => None,
        }
    }
}

/// A strictly positive image dimension.
fn dimension(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    let value = dict.get(key).ok()?.as_i64().ok()?;
    u32::try_from(value).ok().filter(|&v| v > 0)
}

impl PdfRasterizer for LopdfRasterizer {
    fn rasterize(&self, data: &[u8]) -> Result<Vec<DynamicImage>> {
        let doc = self.load(data)?;

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", pages.len());

        // get_pages is keyed by 1-based page number, so iteration is in page order
        let mut rasters = Vec::with_capacity(pages.len());
        for (&page, &page_id) in pages.iter() {
            let raster = self
                .page_images(&doc, page, page_id)
                .into_iter()
                .max_by_key(|img| {
                    let (w, h) = img.dimensions();
                    w as u64 * h as u64
                })
                .ok_or_else(|| {
                    PdfError::ImageExtraction(format!("page {} has no raster image", page))
                })?;

            rasters.push(raster);
        }

        Ok(rasters)
    }
}
