//! Human-readable explanations for analysis verdicts.

use serde::{Deserialize, Serialize};

use crate::core::aggregator::{AnalysisResult, Label, MetadataSummary};
use crate::core::features::FeatureKind;

/// How strongly a single feature points towards generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalLevel {
    Low,
    Moderate,
    High,
}

impl SignalLevel {
    /// Bucket a 0-100 suspicion percentage
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 65.0 {
            SignalLevel::High
        } else if percent >= 35.0 {
            SignalLevel::Moderate
        } else {
            SignalLevel::Low
        }
    }
}

impl std::fmt::Display for SignalLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalLevel::Low => write!(f, "low"),
            SignalLevel::Moderate => write!(f, "moderate"),
            SignalLevel::High => write!(f, "high"),
        }
    }
}

/// One feature's contribution, in plain words
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FeatureKind,
    /// Suspicion percentage as reported in the breakdown
    pub percent: f64,
    pub level: SignalLevel,
    pub description: String,
}

/// Summary plus per-feature findings for a verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictExplanation {
    /// One-line summary (e.g., "Likely authentic (82.5/100, confidence 0.91)")
    pub summary: String,
    /// Findings ordered from most to least suspicious
    pub findings: Vec<Finding>,
}

impl VerdictExplanation {
    /// Findings at or above `level`
    pub fn flagged(&self, level: SignalLevel) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.level >= level)
    }
}

/// Explain `result` for a human reader
pub fn explain(result: &AnalysisResult) -> VerdictExplanation {
    let mut findings: Vec<Finding> = FeatureKind::ALL
        .iter()
        .map(|&kind| {
            let percent = result.breakdown.get(kind);
            let level = SignalLevel::from_percent(percent);
            Finding {
                kind,
                percent,
                level,
                description: describe(kind, level, &result.metadata),
            }
        })
        .collect();

    // Stable sort keeps report order among equal percentages
    findings.sort_by(|a, b| b.percent.total_cmp(&a.percent));

    VerdictExplanation {
        summary: summarize(result),
        findings,
    }
}

fn summarize(result: &AnalysisResult) -> String {
    let lead = match result.label {
        Label::Verified => "Likely authentic",
        Label::Suspicious => "Possibly manipulated or generated",
        Label::AiGenerated => "Likely AI generated",
    };
    format!(
        "{} ({:.1}/100, confidence {:.2})",
        lead, result.score, result.confidence
    )
}

fn describe(kind: FeatureKind, level: SignalLevel, metadata: &MetadataSummary) -> String {
    if let (FeatureKind::MetadataAnomaly, SignalLevel::Low, Some(device)) =
        (kind, level, &metadata.capture_device)
    {
        return format!("Embedded metadata records the capture device: {device}.");
    }

    let text = match (kind, level) {
        (FeatureKind::MetadataAnomaly, SignalLevel::Low) => {
            "Embedded metadata looks like a camera or scanner produced the file."
        }
        (FeatureKind::MetadataAnomaly, SignalLevel::Moderate) => {
            "Embedded metadata is thin: no capture device is recorded."
        }
        (FeatureKind::MetadataAnomaly, SignalLevel::High) => {
            "Embedded metadata is missing or names image-generation software."
        }
        (FeatureKind::NoiseUniformity, SignalLevel::Low) => {
            "Sensor-like noise varies naturally across the image."
        }
        (FeatureKind::NoiseUniformity, SignalLevel::Moderate) => {
            "Noise is somewhat more even across regions than in typical photos."
        }
        (FeatureKind::NoiseUniformity, SignalLevel::High) => {
            "Noise is unusually uniform or absent across the whole image."
        }
        (FeatureKind::EdgeConsistency, SignalLevel::Low) => {
            "Edges show the varied sharpness expected from real optics."
        }
        (FeatureKind::EdgeConsistency, SignalLevel::Moderate) => {
            "Edge sharpness is fairly consistent across the image."
        }
        (FeatureKind::EdgeConsistency, SignalLevel::High) => {
            "Gradients are smooth and uniform, as in rendered or generated images."
        }
        (FeatureKind::CompressionArtifacts, SignalLevel::Low) => {
            "Colour histograms look like a single, ordinary encoding."
        }
        (FeatureKind::CompressionArtifacts, SignalLevel::Moderate) => {
            "Colour histograms show some concentration or gaps."
        }
        (FeatureKind::CompressionArtifacts, SignalLevel::High) => {
            "Colour histograms are narrow or gapped, a sign of synthesis or re-encoding."
        }
    };
    text.to_string()
}
