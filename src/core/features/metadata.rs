//! Metadata anomaly scoring.
//!
//! Cameras and phones write EXIF blocks naming the device; generators and
//! editing pipelines usually strip them or emit lossless RGB files. Each
//! finding adds a fixed penalty and the sum is clamped to [0, 1].

use crate::core::config::MetadataConfig;
use crate::core::loader::DecodedDocument;
use crate::error::AnalysisError;

use super::traits::{FeatureKind, FeatureScore, FeatureScorer};

/// Scores missing or atypical embedded metadata
#[derive(Debug, Clone, Default)]
pub struct MetadataScorer {
    config: MetadataConfig,
}

impl MetadataScorer {
    pub fn new(config: MetadataConfig) -> Self {
        Self { config }
    }

    /// Whether `software` names a known image generator
    fn is_generator(&self, software: &str) -> bool {
        let software = software.to_lowercase();
        self.config
            .generator_signatures
            .iter()
            .any(|signature| software.contains(signature.as_str()))
    }
}

impl FeatureScorer for MetadataScorer {
    fn kind(&self) -> FeatureKind {
        FeatureKind::MetadataAnomaly
    }

    fn score(&self, document: &DecodedDocument) -> Result<FeatureScore, AnalysisError> {
        let metadata = document.metadata();
        let mut anomaly = 0.0;

        if !metadata.has_exif() {
            anomaly += self.config.missing_exif_penalty;
        } else if !metadata.has_capture_device() {
            anomaly += self.config.missing_camera_penalty;
        }

        if document.color_mode().is_color() && document.format().is_lossless() {
            anomaly += self.config.lossless_rgb_penalty;
        }

        if let Some(software) = metadata.software.as_deref() {
            if self.is_generator(software) {
                tracing::debug!(software, "generator signature in EXIF software tag");
                anomaly += self.config.generator_software_penalty;
            }
        }

        FeatureScore::checked(self.kind(), anomaly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loader::{ColorMode, DocumentFormat};
    use crate::core::metadata::EmbeddedMetadata;
    use image::RgbImage;

    fn document(format: DocumentFormat, mode: ColorMode, metadata: EmbeddedMetadata) -> DecodedDocument {
        DecodedDocument::new(RgbImage::new(4, 4), format, mode, metadata, "test", 0)
    }

    fn camera_exif() -> EmbeddedMetadata {
        let mut meta = EmbeddedMetadata {
            camera_make: Some("Canon".to_string()),
            camera_model: Some("EOS R5".to_string()),
            ..Default::default()
        };
        meta.fields.insert("Make".to_string(), "Canon".to_string());
        meta.fields.insert("Model".to_string(), "EOS R5".to_string());
        meta
    }

    fn score(doc: &DecodedDocument) -> f64 {
        MetadataScorer::default().score(doc).unwrap().value()
    }

    #[test]
    fn camera_jpeg_is_clean() {
        let doc = document(DocumentFormat::Jpeg, ColorMode::Rgb, camera_exif());
        assert_eq!(score(&doc), 0.0);
    }

    #[test]
    fn missing_exif_does_not_saturate() {
        let doc = document(DocumentFormat::Jpeg, ColorMode::Rgb, EmbeddedMetadata::default());
        let value = score(&doc);
        assert!((value - 0.3).abs() < 1e-9);
        assert!(value < 1.0);
    }

    #[test]
    fn rgb_png_without_exif_adds_pairing_penalty() {
        let doc = document(DocumentFormat::Png, ColorMode::Rgb, EmbeddedMetadata::default());
        assert!((score(&doc) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn grayscale_png_has_no_pairing_penalty() {
        let doc = document(DocumentFormat::Png, ColorMode::L, EmbeddedMetadata::default());
        assert!((score(&doc) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn exif_without_camera_is_mildly_suspicious() {
        let mut meta = EmbeddedMetadata::default();
        meta.fields.insert("Orientation".to_string(), "row 0 at top".to_string());
        let doc = document(DocumentFormat::Jpeg, ColorMode::Rgb, meta);
        assert!((score(&doc) - 0.15).abs() < 1e-9);
    }

    #[test]
    fn generator_software_is_flagged() {
        let mut meta = EmbeddedMetadata {
            software: Some("Stable Diffusion XL".to_string()),
            ..Default::default()
        };
        meta.fields.insert("Software".to_string(), "Stable Diffusion XL".to_string());
        let doc = document(DocumentFormat::Png, ColorMode::Rgb, meta);

        // missing camera 0.15 + lossless rgb 0.1 + generator 0.4
        assert!((score(&doc) - 0.65).abs() < 1e-9);
    }

    #[test]
    fn penalties_are_clamped() {
        let scorer = MetadataScorer::new(MetadataConfig {
            missing_exif_penalty: 0.9,
            lossless_rgb_penalty: 0.9,
            ..MetadataConfig::default()
        });
        let doc = document(DocumentFormat::WebP, ColorMode::Rgba, EmbeddedMetadata::default());
        assert_eq!(scorer.score(&doc).unwrap().value(), 1.0);
    }
}
