//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};

use crate::core::aggregator::Label;
use crate::core::features::FeatureKind;

/// All events emitted while analyzing documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Per-document analysis events
    Analysis(AnalysisEvent),
}

/// Events for a single document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AnalysisEvent {
    /// Analysis of `filename` has started
    Started { filename: String, bytes: usize },
    /// Moving to a new stage
    StageChanged { stage: AnalysisStage },
    /// One feature finished
    FeatureScored { kind: FeatureKind, score: f64 },
    /// The verdict is ready
    Completed { summary: AnalysisSummary },
    /// Analysis was abandoned on request
    Cancelled { filename: String },
    /// Analysis failed; no result will follow
    Failed { filename: String, message: String },
}

/// Stages of the analysis pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisStage {
    Decoding,
    Extracting,
    Aggregating,
}

/// Short summary of a finished analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub filename: String,
    pub score: f64,
    pub label: Label,
    pub confidence: f64,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisStage::Decoding => write!(f, "Decoding"),
            AnalysisStage::Extracting => write!(f, "Extracting features"),
            AnalysisStage::Aggregating => write!(f, "Aggregating"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Analysis(AnalysisEvent::FeatureScored {
            kind: FeatureKind::NoiseUniformity,
            score: 0.42,
        });

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Analysis(AnalysisEvent::FeatureScored { kind, score }) => {
                assert_eq!(kind, FeatureKind::NoiseUniformity);
                assert_eq!(score, 0.42);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn summary_carries_label_name() {
        let summary = AnalysisSummary {
            filename: "scan.pdf".to_string(),
            score: 42.0,
            label: Label::AiGenerated,
            confidence: 0.8,
            duration_ms: 12,
        };

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("AI Generated"));
    }

    #[test]
    fn stage_display() {
        assert_eq!(AnalysisStage::Extracting.to_string(), "Extracting features");
    }
}
