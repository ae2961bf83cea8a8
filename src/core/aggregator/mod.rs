//! # Aggregator Module
//!
//! Blends feature scores into a single verdict.
//!
//! ## Scoring
//! - `suspicion = Σ weight · score` over the registered scorers
//! - `authenticity = (1 - suspicion) · 100`, clamped and rounded to 0.1
//! - label by fixed thresholds on the rounded authenticity
//! - confidence from how tightly the sub-scores agree
//!
//! ## Confidence
//! `σ` is the weighted standard deviation of the sub-scores around the
//! blended suspicion. Values in [0, 1] cannot spread further than 0.5, so
//! `confidence = 1 - min(σ / 0.5, 1)`: unanimous features give 1.0, a
//! 50/50 split between 0 and 1 gives 0.0.

mod result;

pub use result::{AnalysisResult, FeatureBreakdown, MetadataSummary};

use serde::{Deserialize, Serialize};

use crate::core::config::LabelThresholds;
use crate::core::features::{FeatureKind, FeatureScore};

const MAX_SPREAD: f64 = 0.5;

/// Verdict categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "Verified")]
    Verified,
    #[serde(rename = "Suspicious")]
    Suspicious,
    #[serde(rename = "AI Generated")]
    AiGenerated,
}

impl Label {
    /// Map an authenticity score to its label
    pub fn from_score(authenticity: f64, thresholds: &LabelThresholds) -> Self {
        if authenticity >= thresholds.verified {
            Label::Verified
        } else if authenticity >= thresholds.suspicious {
            Label::Suspicious
        } else {
            Label::AiGenerated
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Verified => "Verified",
            Label::Suspicious => "Suspicious",
            Label::AiGenerated => "AI Generated",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One feature's contribution to the blend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedScore {
    pub kind: FeatureKind,
    pub weight: f64,
    pub score: FeatureScore,
}

/// The blended outcome before document details are attached
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    /// Weighted suspicion in [0, 1]
    pub suspicion: f64,
    /// Authenticity in [0, 100], rounded to one decimal
    pub authenticity: f64,
    pub label: Label,
    /// Agreement between features in [0, 1], rounded to two decimals
    pub confidence: f64,
}

/// Blend `scores` into a verdict
pub fn aggregate(scores: &[WeightedScore], thresholds: &LabelThresholds) -> Verdict {
    let suspicion = weighted_mean(scores).clamp(0.0, 1.0);
    let authenticity = round_to(((1.0 - suspicion) * 100.0).clamp(0.0, 100.0), 1);
    let label = Label::from_score(authenticity, thresholds);
    let confidence = round_to(agreement(scores, suspicion), 2);

    Verdict {
        suspicion,
        authenticity,
        label,
        confidence,
    }
}

fn total_weight(scores: &[WeightedScore]) -> f64 {
    scores.iter().map(|s| s.weight).sum()
}

fn weighted_mean(scores: &[WeightedScore]) -> f64 {
    let total = total_weight(scores);
    if total <= 0.0 {
        return 0.0;
    }
    scores
        .iter()
        .map(|s| s.weight * s.score.value())
        .sum::<f64>()
        / total
}

/// `1 - min(σ / 0.5, 1)` with σ the weighted spread around `mean`
fn agreement(scores: &[WeightedScore], mean: f64) -> f64 {
    let total = total_weight(scores);
    if total <= 0.0 {
        return 0.0;
    }
    let variance = scores
        .iter()
        .map(|s| s.weight * (s.score.value() - mean).powi(2))
        .sum::<f64>()
        / total;
    (1.0 - (variance.sqrt() / MAX_SPREAD).min(1.0)).clamp(0.0, 1.0)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weighted(values: [f64; 4]) -> Vec<WeightedScore> {
        let weights = [0.2, 0.3, 0.3, 0.2];
        FeatureKind::ALL
            .iter()
            .zip(values)
            .zip(weights)
            .map(|((&kind, value), weight)| WeightedScore {
                kind,
                weight,
                score: FeatureScore::checked(kind, value).unwrap(),
            })
            .collect()
    }

    #[test]
    fn label_boundaries_do_not_overlap() {
        let t = LabelThresholds::default();
        assert_eq!(Label::from_score(74.9, &t), Label::Suspicious);
        assert_eq!(Label::from_score(75.0, &t), Label::Verified);
        assert_eq!(Label::from_score(49.9, &t), Label::AiGenerated);
        assert_eq!(Label::from_score(50.0, &t), Label::Suspicious);
        assert_eq!(Label::from_score(100.0, &t), Label::Verified);
        assert_eq!(Label::from_score(0.0, &t), Label::AiGenerated);
    }

    #[test]
    fn custom_thresholds_apply() {
        let t = LabelThresholds {
            verified: 90.0,
            suspicious: 20.0,
        };
        assert_eq!(Label::from_score(85.0, &t), Label::Suspicious);
        assert_eq!(Label::from_score(25.0, &t), Label::Suspicious);
        assert_eq!(Label::from_score(19.9, &t), Label::AiGenerated);
    }

    #[test]
    fn label_serializes_display_names() {
        assert_eq!(
            serde_json::to_string(&Label::AiGenerated).unwrap(),
            "\"AI Generated\""
        );
        assert_eq!(Label::Verified.to_string(), "Verified");
    }

    #[test]
    fn blend_uses_fixed_weights() {
        let verdict = aggregate(&weighted([1.0, 0.0, 0.0, 0.0]), &LabelThresholds::default());
        assert!((verdict.suspicion - 0.2).abs() < 1e-12);
        assert_eq!(verdict.authenticity, 80.0);
        assert_eq!(verdict.label, Label::Verified);
    }

    #[test]
    fn all_suspicious_is_ai_generated() {
        let verdict = aggregate(&weighted([1.0, 1.0, 1.0, 1.0]), &LabelThresholds::default());
        assert_eq!(verdict.authenticity, 0.0);
        assert_eq!(verdict.label, Label::AiGenerated);
        assert_eq!(verdict.confidence, 1.0);
    }

    #[test]
    fn agreement_drives_confidence() {
        let t = LabelThresholds::default();
        let unanimous = aggregate(&weighted([0.3, 0.3, 0.3, 0.3]), &t);
        let split = aggregate(&weighted([0.0, 1.0, 0.0, 1.0]), &t);
        let mixed = aggregate(&weighted([0.2, 0.4, 0.3, 0.5]), &t);

        assert_eq!(unanimous.confidence, 1.0);
        assert_eq!(split.confidence, 0.0);
        assert!(mixed.confidence > split.confidence);
        assert!(mixed.confidence < unanimous.confidence);
    }

    #[test]
    fn authenticity_is_rounded_before_labelling() {
        // suspicion 0.2501 -> 74.99 -> reported 75.0, labelled Verified
        let verdict = aggregate(
            &weighted([0.2501, 0.2501, 0.2501, 0.2501]),
            &LabelThresholds::default(),
        );
        assert_eq!(verdict.authenticity, 75.0);
        assert_eq!(verdict.label, Label::Verified);
    }

    #[test]
    fn outputs_stay_in_range() {
        for values in [
            [0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 1.0, 0.0],
            [0.5, 0.9, 0.1, 0.7],
        ] {
            let v = aggregate(&weighted(values), &LabelThresholds::default());
            assert!((0.0..=100.0).contains(&v.authenticity));
            assert!((0.0..=1.0).contains(&v.confidence));
        }
    }
}
