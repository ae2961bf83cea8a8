//! # Loader Module
//!
//! Turns an upload into a [`DecodedDocument`].
//!
//! ## Accepted Types
//! - `image/jpeg` (and the common `image/jpg` alias)
//! - `image/png`
//! - `image/webp`
//! - `application/pdf` - only the first page is rasterized
//!
//! Anything else is rejected with [`LoadError::UnsupportedFormat`] before a
//! single byte is decoded.

mod decode;
mod pdf;
mod resize;

pub use decode::ImageDecoder;
pub use pdf::PdfPageRenderer;

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::config::PdfConfig;
use crate::core::metadata::EmbeddedMetadata;
use crate::error::LoadError;

/// Document formats the scanner understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentFormat {
    Jpeg,
    Png,
    WebP,
    Pdf,
}

impl DocumentFormat {
    /// Parse a declared MIME type. Parameters and case are ignored.
    pub fn from_content_type(content_type: &str) -> Result<Self, LoadError> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Ok(Self::Jpeg),
            "image/png" => Ok(Self::Png),
            "image/webp" => Ok(Self::WebP),
            "application/pdf" => Ok(Self::Pdf),
            _ => Err(LoadError::UnsupportedFormat {
                content_type: content_type.to_string(),
            }),
        }
    }

    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("jpg" | "jpeg") => Some(Self::Jpeg),
            Some("png") => Some(Self::Png),
            Some("webp") => Some(Self::WebP),
            Some("pdf") => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Canonical MIME type
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Pdf => "application/pdf",
        }
    }

    /// Short upper-case name used in reports
    pub fn name(&self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::WebP => "WEBP",
            Self::Pdf => "PDF",
        }
    }

    /// Formats that store pixels without lossy compression
    pub fn is_lossless(&self) -> bool {
        matches!(self, Self::Png | Self::WebP)
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Channel layout of the source pixels before normalization to RGB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMode {
    /// Single luminance channel
    L,
    /// Luminance + alpha
    La,
    Rgb,
    Rgba,
    Cmyk,
}

impl ColorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L => "L",
            Self::La => "LA",
            Self::Rgb => "RGB",
            Self::Rgba => "RGBA",
            Self::Cmyk => "CMYK",
        }
    }

    /// Whether the source carried colour channels
    pub fn is_color(&self) -> bool {
        matches!(self, Self::Rgb | Self::Rgba | Self::Cmyk)
    }
}

impl std::fmt::Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One upload as handed over by the transport layer
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub bytes: Vec<u8>,
    pub declared_content_type: String,
    pub filename: String,
}

impl AnalyzeRequest {
    pub fn new(
        bytes: Vec<u8>,
        declared_content_type: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            bytes,
            declared_content_type: declared_content_type.into(),
            filename: filename.into(),
        }
    }

    /// Reject uploads above `limit` bytes
    pub fn ensure_within(&self, limit: u64) -> Result<(), LoadError> {
        let size = self.bytes.len() as u64;
        if size > limit {
            return Err(LoadError::TooLarge { size, limit });
        }
        Ok(())
    }
}

/// A decoded upload, normalized to 8-bit RGB
///
/// Built once per request and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct DecodedDocument {
    pixels: RgbImage,
    luminance: GrayImage,
    format: DocumentFormat,
    color_mode: ColorMode,
    metadata: EmbeddedMetadata,
    filename: String,
    byte_size: usize,
}

impl DecodedDocument {
    /// Assemble a document from already-decoded pixels
    pub fn new(
        pixels: RgbImage,
        format: DocumentFormat,
        color_mode: ColorMode,
        metadata: EmbeddedMetadata,
        filename: impl Into<String>,
        byte_size: usize,
    ) -> Self {
        let luminance = image::DynamicImage::ImageRgb8(pixels.clone()).to_luma8();
        Self {
            pixels,
            luminance,
            format,
            color_mode,
            metadata,
            filename: filename.into(),
            byte_size,
        }
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Luminance channel derived from the RGB grid
    pub fn luminance(&self) -> &GrayImage {
        &self.luminance
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    pub fn metadata(&self) -> &EmbeddedMetadata {
        &self.metadata
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// (width, height) in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Decodes uploads of any accepted type
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    pdf: PdfPageRenderer,
}

impl DocumentLoader {
    pub fn new(pdf_config: PdfConfig) -> Self {
        Self {
            pdf: PdfPageRenderer::new(pdf_config),
        }
    }

    /// Decode `request` according to its declared content type
    pub fn load(&self, request: &AnalyzeRequest) -> Result<DecodedDocument, LoadError> {
        let format = DocumentFormat::from_content_type(&request.declared_content_type)?;

        let decoded = match format {
            DocumentFormat::Pdf => self.pdf.render_first_page(&request.bytes)?,
            _ => ImageDecoder::decode(&request.bytes, format)?,
        };

        let (width, height) = decoded.pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(LoadError::Decode {
                format: format.name().to_string(),
                reason: "image has no pixels".to_string(),
            });
        }

        tracing::debug!(
            filename = %request.filename,
            format = %format,
            mode = %decoded.color_mode,
            width,
            height,
            exif_fields = decoded.metadata.field_count(),
            "decoded upload"
        );

        Ok(DecodedDocument::new(
            decoded.pixels,
            format,
            decoded.color_mode,
            decoded.metadata,
            request.filename.clone(),
            request.bytes.len(),
        ))
    }
}

/// Pixels plus metadata as produced by a format-specific decoder
#[derive(Debug)]
pub(crate) struct DecodedPixels {
    pub pixels: RgbImage,
    pub color_mode: ColorMode,
    pub metadata: EmbeddedMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;

    fn encoded_png(width: u32, height: u32) -> Vec<u8> {
        let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x * 7) as u8, (y * 11) as u8, ((x + y) * 3) as u8])
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn content_type_parsing() {
        assert_eq!(
            DocumentFormat::from_content_type("image/jpeg").unwrap(),
            DocumentFormat::Jpeg
        );
        assert_eq!(
            DocumentFormat::from_content_type("image/jpg").unwrap(),
            DocumentFormat::Jpeg
        );
        assert_eq!(
            DocumentFormat::from_content_type("IMAGE/PNG").unwrap(),
            DocumentFormat::Png
        );
        assert_eq!(
            DocumentFormat::from_content_type("application/pdf; charset=binary").unwrap(),
            DocumentFormat::Pdf
        );
    }

    #[test]
    fn text_plain_is_unsupported() {
        let err = DocumentFormat::from_content_type("text/plain").unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat { .. }));
    }

    #[test]
    fn format_detection_from_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("scan.JPEG")),
            Some(DocumentFormat::Jpeg)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("invoice.pdf")),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("notes.txt")), None);
    }

    #[test]
    fn loads_png_upload() {
        let bytes = encoded_png(40, 30);
        let size = bytes.len();
        let request = AnalyzeRequest::new(bytes, "image/png", "sample.png");

        let doc = DocumentLoader::default().load(&request).unwrap();
        assert_eq!(doc.dimensions(), (40, 30));
        assert_eq!(doc.format(), DocumentFormat::Png);
        assert_eq!(doc.color_mode(), ColorMode::Rgb);
        assert_eq!(doc.filename(), "sample.png");
        assert_eq!(doc.byte_size(), size);
        assert_eq!(doc.luminance().dimensions(), (40, 30));
        assert!(!doc.metadata().has_exif());
    }

    #[test]
    fn png_declared_as_jpeg_fails_to_decode() {
        let request = AnalyzeRequest::new(encoded_png(8, 8), "image/jpeg", "lie.jpg");
        let err = DocumentLoader::default().load(&request).unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    #[test]
    fn size_limit_enforced() {
        let request = AnalyzeRequest::new(vec![0; 11], "image/png", "big.png");
        assert!(request.ensure_within(10).is_err());
        assert!(request.ensure_within(11).is_ok());
    }
}
