//! Compression artifact scoring from per-channel histograms.
//!
//! Repeated lossy encoding narrows the tonal range, piles pixels into a few
//! dominant levels and leaves periodic empty bins where values were
//! re-quantized. Each channel is scored on those three signals and the
//! channel scores are averaged.

use image::RgbImage;

use crate::core::config::CompressionConfig;
use crate::core::loader::DecodedDocument;
use crate::error::AnalysisError;

use super::traits::{FeatureKind, FeatureScore, FeatureScorer};

const BINS: usize = 256;

/// Signals measured on one channel histogram, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSignals {
    /// Narrow tonal range
    pub spread: f64,
    /// Share of pixels in the fullest bins, above what a flat histogram has
    pub peak: f64,
    /// Empty bins inside the occupied range
    pub gaps: f64,
}

/// Scores histogram signatures of re-encoding
#[derive(Debug, Clone, Default)]
pub struct CompressionScorer {
    config: CompressionConfig,
}

impl CompressionScorer {
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    /// Histogram signals for the R, G and B channels
    pub fn channel_signals(&self, pixels: &RgbImage) -> [ChannelSignals; 3] {
        let histograms = histograms(pixels);
        histograms.map(|h| self.signals(&h))
    }

    fn signals(&self, histogram: &[u64; BINS]) -> ChannelSignals {
        let total: u64 = histogram.iter().sum();
        if total == 0 {
            return ChannelSignals {
                spread: 0.0,
                peak: 0.0,
                gaps: 0.0,
            };
        }
        let n = total as f64;

        let mean = histogram
            .iter()
            .enumerate()
            .map(|(level, &count)| level as f64 * count as f64)
            .sum::<f64>()
            / n;
        let variance = histogram
            .iter()
            .enumerate()
            .map(|(level, &count)| (level as f64 - mean).powi(2) * count as f64)
            .sum::<f64>()
            / n;
        let spread = 1.0 - (variance.sqrt() / self.config.spread_reference).min(1.0);

        let mut sorted = *histogram;
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        let peak_bins = self.config.peak_bins.clamp(1, BINS - 1);
        let top: u64 = sorted[..peak_bins].iter().sum();
        let baseline = peak_bins as f64 / BINS as f64;
        let peak = ((top as f64 / n - baseline) / (1.0 - baseline)).clamp(0.0, 1.0);

        let first = histogram.iter().position(|&c| c > 0).unwrap_or(0);
        let last = histogram.iter().rposition(|&c| c > 0).unwrap_or(0);
        let range = last - first + 1;
        let empty = histogram[first..=last].iter().filter(|&&c| c == 0).count();
        let gaps = empty as f64 / range as f64;

        ChannelSignals { spread, peak, gaps }
    }

    fn combine(&self, signals: &ChannelSignals) -> f64 {
        self.config.spread_weight * signals.spread
            + self.config.peak_weight * signals.peak
            + self.config.gap_weight * signals.gaps
    }
}

impl FeatureScorer for CompressionScorer {
    fn kind(&self) -> FeatureKind {
        FeatureKind::CompressionArtifacts
    }

    fn score(&self, document: &DecodedDocument) -> Result<FeatureScore, AnalysisError> {
        let channels = self.channel_signals(document.pixels());
        let value = channels.iter().map(|s| self.combine(s)).sum::<f64>() / channels.len() as f64;
        FeatureScore::checked(self.kind(), value)
    }
}

fn histograms(pixels: &RgbImage) -> [[u64; BINS]; 3] {
    let mut histograms = [[0u64; BINS]; 3];
    for pixel in pixels.pixels() {
        for (channel, &value) in pixel.0.iter().enumerate() {
            histograms[channel][value as usize] += 1;
        }
    }
    histograms
}
