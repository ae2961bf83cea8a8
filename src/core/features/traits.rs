//! Trait definitions for feature scorers.

use serde::{Deserialize, Serialize};

use crate::core::loader::DecodedDocument;
use crate::error::AnalysisError;

/// Neutral score used when a feature has too little data to judge
pub const NEUTRAL_SCORE: f64 = 0.5;

/// The four forensic signals blended into a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Missing or atypical embedded metadata
    MetadataAnomaly,
    /// Unnaturally uniform noise across the image
    NoiseUniformity,
    /// Over-smoothed, uniform gradients
    EdgeConsistency,
    /// Histogram signatures of re-encoding
    CompressionArtifacts,
}

impl FeatureKind {
    /// All kinds in report order
    pub const ALL: [FeatureKind; 4] = [
        FeatureKind::MetadataAnomaly,
        FeatureKind::NoiseUniformity,
        FeatureKind::EdgeConsistency,
        FeatureKind::CompressionArtifacts,
    ];

    /// Field name used in serialized breakdowns
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::MetadataAnomaly => "metadata_anomaly",
            FeatureKind::NoiseUniformity => "noise_uniformity",
            FeatureKind::EdgeConsistency => "edge_consistency",
            FeatureKind::CompressionArtifacts => "compression_artifacts",
        }
    }
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Degree of suspicion for one feature, always within [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct FeatureScore(f64);

impl FeatureScore {
    /// Wrap a raw score, clamping it into [0, 1].
    ///
    /// A NaN or infinite value means the extractor divided by something
    /// degenerate; that is reported as a compute failure, never clamped.
    pub fn checked(kind: FeatureKind, value: f64) -> Result<Self, AnalysisError> {
        if !value.is_finite() {
            return Err(AnalysisError::Compute {
                feature: kind.to_string(),
                reason: format!("score is not a finite number ({value})"),
            });
        }
        Ok(Self(value.clamp(0.0, 1.0)))
    }

    /// The neutral mid-score
    pub fn neutral() -> Self {
        Self(NEUTRAL_SCORE)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Score as a percentage rounded to one decimal
    pub fn as_percent(&self) -> f64 {
        (self.0 * 1000.0).round() / 10.0
    }
}

/// A forensic signal computed from a decoded document
///
/// Implementations only read the document, so the pipeline runs them in
/// parallel.
pub trait FeatureScorer: Send + Sync {
    /// Which signal this scorer produces
    fn kind(&self) -> FeatureKind;

    /// Compute the suspicion score for `document`
    fn score(&self, document: &DecodedDocument) -> Result<FeatureScore, AnalysisError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_are_clamped() {
        let high = FeatureScore::checked(FeatureKind::EdgeConsistency, 1.7).unwrap();
        let low = FeatureScore::checked(FeatureKind::EdgeConsistency, -0.2).unwrap();
        assert_eq!(high.value(), 1.0);
        assert_eq!(low.value(), 0.0);
    }

    #[test]
    fn nan_is_a_compute_error() {
        let err = FeatureScore::checked(FeatureKind::NoiseUniformity, f64::NAN).unwrap_err();
        match err {
            AnalysisError::Compute { feature, .. } => assert_eq!(feature, "noise_uniformity"),
            other => panic!("expected compute error, got {other:?}"),
        }
    }

    #[test]
    fn percent_rounds_to_one_decimal() {
        let score = FeatureScore::checked(FeatureKind::MetadataAnomaly, 0.12345).unwrap();
        assert_eq!(score.as_percent(), 12.3);
    }

    #[test]
    fn kind_names_match_breakdown_fields() {
        let names: Vec<&str> = FeatureKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(
            names,
            [
                "metadata_anomaly",
                "noise_uniformity",
                "edge_consistency",
                "compression_artifacts"
            ]
        );
        let json = serde_json::to_string(&FeatureKind::EdgeConsistency).unwrap();
        assert_eq!(json, "\"edge_consistency\"");
    }
}
