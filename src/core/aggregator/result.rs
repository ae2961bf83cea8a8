//! The structured result returned for every analyzed document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Label, Verdict, WeightedScore};
use crate::core::features::{FeatureKind, WatermarkReport};
use crate::core::loader::DecodedDocument;

/// Per-feature suspicion as percentages (0-100, one decimal)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureBreakdown {
    pub metadata_anomaly: f64,
    pub noise_uniformity: f64,
    pub edge_consistency: f64,
    pub compression_artifacts: f64,
}

impl FeatureBreakdown {
    fn from_scores(scores: &[WeightedScore]) -> Self {
        let mut breakdown = Self::default();
        for s in scores {
            let percent = s.score.as_percent();
            match s.kind {
                FeatureKind::MetadataAnomaly => breakdown.metadata_anomaly = percent,
                FeatureKind::NoiseUniformity => breakdown.noise_uniformity = percent,
                FeatureKind::EdgeConsistency => breakdown.edge_consistency = percent,
                FeatureKind::CompressionArtifacts => breakdown.compression_artifacts = percent,
            }
        }
        breakdown
    }

    /// Percentage for one feature
    pub fn get(&self, kind: FeatureKind) -> f64 {
        match kind {
            FeatureKind::MetadataAnomaly => self.metadata_anomaly,
            FeatureKind::NoiseUniformity => self.noise_uniformity,
            FeatureKind::EdgeConsistency => self.edge_consistency,
            FeatureKind::CompressionArtifacts => self.compression_artifacts,
        }
    }
}

/// What the loader found out about the upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataSummary {
    pub format: String,
    pub mode: String,
    /// [width, height]
    pub size: [u32; 2],
    pub filename: String,
    pub has_exif: bool,
    pub exif_fields: usize,
    /// Camera make and model from EXIF, when recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_device: Option<String>,
    /// EXIF `DateTimeOriginal`, when recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
}

impl MetadataSummary {
    pub fn from_document(document: &DecodedDocument) -> Self {
        let (width, height) = document.dimensions();
        Self {
            format: document.format().name().to_string(),
            mode: document.color_mode().as_str().to_string(),
            size: [width, height],
            filename: document.filename().to_string(),
            has_exif: document.metadata().has_exif(),
            exif_fields: document.metadata().field_count(),
            capture_device: document.metadata().camera_display(),
            captured_at: document.metadata().date_taken,
        }
    }
}

/// Authenticity verdict for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Authenticity, 0-100 with one decimal
    pub score: f64,
    pub label: Label,
    /// 0-1 with two decimals
    pub confidence: f64,
    pub breakdown: FeatureBreakdown,
    pub metadata: MetadataSummary,
    pub synthid: WatermarkReport,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn new(
        verdict: &Verdict,
        scores: &[WeightedScore],
        document: &DecodedDocument,
        synthid: WatermarkReport,
    ) -> Self {
        Self {
            score: verdict.authenticity,
            label: verdict.label,
            confidence: verdict.confidence,
            breakdown: FeatureBreakdown::from_scores(scores),
            metadata: MetadataSummary::from_document(document),
            synthid,
            analyzed_at: Utc::now(),
        }
    }
}
