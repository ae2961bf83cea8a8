//! First-page PDF rasterization.
//!
//! lopdf opens the document first. That pass finds page one and its page
//! box, and checks the declared size of every image on the page against
//! `max_pixels`, all before any stream is decompressed. The page is then
//! drawn by one of two engines:
//!
//! - **PDFium** renders the whole page (text, vector art, images) at
//!   `render_scale`. Needs the native library at runtime.
//! - **Embedded images** decodes the page's largest raster image and
//!   resamples it to the page box. Pure Rust; suits scanned documents.
//!
//! [`PdfBackend::Auto`] uses PDFium whenever the library can be bound.

mod embedded;
mod objects;
mod pdfium;

use lopdf::Document;

use super::resize::fit_within;
use super::{ColorMode, DecodedPixels};
use crate::core::config::{PdfBackend, PdfConfig};
use crate::error::LoadError;

use objects::{first_page, largest, page_box, page_images, PageImage};

/// Renders the first page of a PDF into an RGB grid
#[derive(Debug, Clone, Default)]
pub struct PdfPageRenderer {
    config: PdfConfig,
}

impl PdfPageRenderer {
    pub fn new(config: PdfConfig) -> Self {
        Self { config }
    }

    /// Rasterize page one. Later pages are never parsed for content.
    pub(crate) fn render_first_page(&self, bytes: &[u8]) -> Result<DecodedPixels, LoadError> {
        let doc = Document::load_mem(bytes).map_err(|e| pdf_error(format!("invalid PDF: {e}")))?;
        let page = first_page(&doc)?;
        let images = page_images(&doc, page);
        self.check_image_sizes(&images)?;

        let main_image = largest(&images);
        let metadata = main_image
            .map(embedded::image_metadata)
            .unwrap_or_default();

        let pixels = match self.config.backend {
            PdfBackend::EmbeddedImages => {
                let image = main_image.ok_or_else(|| pdf_error("first page has no raster content"))?;
                embedded::render(&doc, image, self.target_bounds(page_box(&doc, page)), self.config.max_pixels)?
            }
            PdfBackend::Pdfium => {
                let pdfium = pdfium::load()?;
                pdfium::render(&pdfium, bytes, |size| self.target_bounds(size))?
            }
            PdfBackend::Auto => match pdfium::load() {
                Ok(pdfium) => pdfium::render(&pdfium, bytes, |size| self.target_bounds(size))?,
                Err(unavailable) => {
                    let Some(image) = main_image else {
                        // Text or vector only: nothing to fall back on
                        return Err(unavailable);
                    };
                    tracing::debug!(error = %unavailable, "falling back to embedded page images");
                    embedded::render(&doc, image, self.target_bounds(page_box(&doc, page)), self.config.max_pixels)?
                }
            },
        };

        Ok(DecodedPixels {
            pixels,
            color_mode: ColorMode::Rgb,
            metadata,
        })
    }

    /// Reject pages whose images declare more pixels than allowed
    fn check_image_sizes(&self, images: &[PageImage<'_>]) -> Result<(), LoadError> {
        match images.iter().find(|image| image.area() > self.config.max_pixels) {
            Some(image) => Err(LoadError::TooManyPixels {
                width: image.width,
                height: image.height,
                limit: self.config.max_pixels,
            }),
            None => Ok(()),
        }
    }

    /// Pixel bounds of the rendered page, capped at `max_dimension` per side
    /// and `max_pixels` in total
    fn target_bounds(&self, (width_pt, height_pt): (f64, f64)) -> (u32, u32) {
        let scale = self.config.render_scale;
        let width = (width_pt * scale).round().clamp(1.0, u32::MAX as f64) as u32;
        let height = (height_pt * scale).round().clamp(1.0, u32::MAX as f64) as u32;

        let cap = self.config.max_dimension;
        let (width, height) = if width.max(height) <= cap {
            (width, height)
        } else {
            fit_within((width, height), (cap, cap))
        };

        let area = width as u64 * height as u64;
        if area <= self.config.max_pixels {
            return (width, height);
        }
        let shrink = (self.config.max_pixels as f64 / area as f64).sqrt();
        (
            ((width as f64 * shrink).floor() as u32).max(1),
            ((height as f64 * shrink).floor() as u32).max(1),
        )
    }
}

fn pdf_error(reason: impl Into<String>) -> LoadError {
    LoadError::Decode {
        format: "PDF".to_string(),
        reason: reason.into(),
    }
}
