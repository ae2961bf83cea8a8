//! Full page rendering via Google PDFium.
//!
//! Draws everything on the page: text with embedded or CID fonts, vector
//! art and images. `Pdfium` is `!Send`, so each render binds a fresh handle;
//! the OS caches the loaded library, which keeps repeat binds cheap.

use image::RgbImage;
use pdfium_render::prelude::*;

use super::pdf_error;
use crate::error::LoadError;

/// Explicit path to the PDFium shared library
const LIBRARY_PATH_VAR: &str = "PDFIUM_DYNAMIC_LIB_PATH";

/// Bind the PDFium library.
///
/// Discovery order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH`
/// 2. Alongside the running executable
/// 3. System library search paths
pub(super) fn load() -> Result<Pdfium, LoadError> {
    if let Ok(path) = std::env::var(LIBRARY_PATH_VAR) {
        tracing::debug!(path = %path, "loading PDFium from env var");
        let bindings = Pdfium::bind_to_library(&path)
            .map_err(|e| unavailable(format!("cannot load PDFium from {path}: {e}")))?;
        return Ok(Pdfium::new(bindings));
    }

    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
    {
        let lib_path = Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            tracing::debug!(dir = %dir.display(), "loaded PDFium next to the executable");
            return Ok(Pdfium::new(bindings));
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        unavailable(format!(
            "PDFium library not found. Set {LIBRARY_PATH_VAR} or install PDFium: {e}"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

/// Render page one into the pixel bounds `bounds_for` picks for its size in points
pub(super) fn render(
    pdfium: &Pdfium,
    bytes: &[u8],
    bounds_for: impl Fn((f64, f64)) -> (u32, u32),
) -> Result<RgbImage, LoadError> {
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(map_load_error)?;
    let pages = document.pages();
    let page = pages.get(0).map_err(|_| LoadError::NoPages)?;

    let size_pt = (page.width().value as f64, page.height().value as f64);
    let (width, height) = bounds_for(size_pt);

    let config = PdfRenderConfig::new()
        .set_target_width(width as i32)
        .set_maximum_height(height as i32);
    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| pdf_error(format!("rendering failed: {e}")))?;

    let (rendered_width, rendered_height) = (bitmap.width() as u32, bitmap.height() as u32);
    tracing::debug!(
        width = rendered_width,
        height = rendered_height,
        "rendered first PDF page with PDFium"
    );
    rgba_to_rgb(rendered_width, rendered_height, &bitmap.as_rgba_bytes())
}

/// Drop the alpha channel of a page rendered onto a white background
fn rgba_to_rgb(width: u32, height: u32, rgba: &[u8]) -> Result<RgbImage, LoadError> {
    let rgb: Vec<u8> = rgba
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| pdf_error("rendered bitmap has the wrong size"))
}

/// Encrypted documents get their own message
fn map_load_error(e: PdfiumError) -> LoadError {
    let message = e.to_string();
    let lower = message.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        pdf_error("password-protected PDFs are not supported")
    } else {
        pdf_error(format!("invalid PDF: {message}"))
    }
}

fn unavailable(reason: String) -> LoadError {
    LoadError::RendererUnavailable { reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn alpha_is_dropped() {
        let rgba = [10, 20, 30, 255, 200, 210, 220, 255];
        let rgb = rgba_to_rgb(2, 1, &rgba).unwrap();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([10, 20, 30]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([200, 210, 220]));
    }

    #[test]
    fn short_bitmap_is_an_error() {
        assert!(rgba_to_rgb(2, 2, &[0; 8]).is_err());
    }
}
