//! Watermark detection extension point.
//!
//! No detector is wired up yet. [`SynthIdStub`] always reports itself as
//! unavailable and contributes nothing to the blended score.

use serde::{Deserialize, Serialize};

use crate::core::loader::DecodedDocument;

/// Outcome of a watermark check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkReport {
    pub synthid_enabled: bool,
    /// `None` when no detection was attempted
    pub watermark_detected: Option<bool>,
    pub confidence: f64,
    pub message: String,
}

impl WatermarkReport {
    /// Report for a detector that did not run
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            synthid_enabled: false,
            watermark_detected: None,
            confidence: 0.0,
            message: message.into(),
        }
    }
}

/// A detector for embedded generator watermarks
pub trait WatermarkDetector: Send + Sync {
    /// Whether the detector can actually run
    fn is_available(&self) -> bool;

    /// Check `document` for a watermark
    fn detect(&self, document: &DecodedDocument) -> WatermarkReport;
}

/// Placeholder for Google SynthID detection
#[derive(Debug, Clone, Copy, Default)]
pub struct SynthIdStub;

impl WatermarkDetector for SynthIdStub {
    fn is_available(&self) -> bool {
        false
    }

    fn detect(&self, _document: &DecodedDocument) -> WatermarkReport {
        WatermarkReport::unavailable("SynthID integration pending - API credentials required")
    }
}
