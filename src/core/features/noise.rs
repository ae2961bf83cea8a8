//! Noise uniformity scoring.
//!
//! Camera sensors leave noise whose strength changes with scene content, so
//! the per-window variance of a real photo swings widely. Generated or heavily
//! denoised images look the same everywhere.
//!
//! ## Algorithm
//! 1. Tile the luminance channel into non-overlapping square windows
//! 2. Compute the intensity variance of every full window
//! 3. `cv = std(variances) / mean(variances)` (0 when every window is flat)
//! 4. `uniformity = 1 - min(cv / cv_threshold, 1)`
//! 5. `score = uniformity * (1 - min(rms_window_std / noise_floor, 1))`
//!
//! Step 5 keeps strong per-pixel noise from reading as synthetic: uniform
//! *and* quiet is suspicious, uniform but noisy is what a sensor produces.

use image::GrayImage;
use rayon::prelude::*;

use crate::core::config::NoiseConfig;
use crate::core::loader::DecodedDocument;
use crate::error::AnalysisError;

use super::traits::{FeatureKind, FeatureScore, FeatureScorer};

/// Window statistics behind a noise score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseStats {
    /// Side length of the windows used
    pub window: u32,
    /// Number of full windows
    pub windows: usize,
    /// Coefficient of variation of the window variances
    pub coefficient_of_variation: f64,
    /// Root of the mean window variance, in grey levels
    pub rms_std: f64,
}

/// Scores how uniform the noise is across the image
#[derive(Debug, Clone, Default)]
pub struct NoiseScorer {
    config: NoiseConfig,
}

impl NoiseScorer {
    pub fn new(config: NoiseConfig) -> Self {
        Self { config }
    }

    /// Pick the window side: the fixed override, else the largest candidate
    /// that still yields `min_windows` full windows, else the smallest one.
    pub fn window_for(&self, width: u32, height: u32) -> u32 {
        if let Some(fixed) = self.config.fixed_window {
            return fixed;
        }
        let mut candidates = self.config.window_sizes.clone();
        candidates.sort_unstable_by(|a, b| b.cmp(a));

        candidates
            .iter()
            .copied()
            .find(|&side| window_count(width, height, side) >= self.config.min_windows)
            .or_else(|| candidates.last().copied())
            .unwrap_or(8)
    }

    /// Compute window statistics, or `None` when fewer than two windows fit
    pub fn stats(&self, luma: &GrayImage) -> Option<NoiseStats> {
        let (width, height) = luma.dimensions();
        let window = self.window_for(width, height);
        let windows = window_count(width, height, window);
        if windows < 2 {
            return None;
        }

        let cols = width / window;
        let rows = height / window;
        let variances: Vec<f64> = (0..rows * cols)
            .into_par_iter()
            .map(|index| {
                let (wx, wy) = (index % cols, index / cols);
                window_variance(luma, wx * window, wy * window, window)
            })
            .collect();

        let n = variances.len() as f64;
        let mean = variances.iter().sum::<f64>() / n;
        let spread = (variances.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        let coefficient_of_variation = if mean > 0.0 { spread / mean } else { 0.0 };

        Some(NoiseStats {
            window,
            windows,
            coefficient_of_variation,
            rms_std: mean.sqrt(),
        })
    }

    fn score_stats(&self, stats: &NoiseStats) -> f64 {
        let uniformity =
            1.0 - (stats.coefficient_of_variation / self.config.cv_threshold).min(1.0);
        let energy = (stats.rms_std / self.config.noise_floor).min(1.0);
        uniformity * (1.0 - energy)
    }
}

impl FeatureScorer for NoiseScorer {
    fn kind(&self) -> FeatureKind {
        FeatureKind::NoiseUniformity
    }

    fn score(&self, document: &DecodedDocument) -> Result<FeatureScore, AnalysisError> {
        match self.stats(document.luminance()) {
            Some(stats) => {
                tracing::trace!(?stats, "noise window statistics");
                FeatureScore::checked(self.kind(), self.score_stats(&stats))
            }
            None => Ok(FeatureScore::neutral()),
        }
    }
}

fn window_count(width: u32, height: u32, side: u32) -> usize {
    if side == 0 {
        return 0;
    }
    (width / side) as usize * (height / side) as usize
}

/// Population variance of one `side`×`side` window
fn window_variance(luma: &GrayImage, x0: u32, y0: u32, side: u32) -> f64 {
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in y0..y0 + side {
        for x in x0..x0 + side {
            let v = luma.get_pixel(x, y)[0] as f64;
            sum += v;
            sum_sq += v * v;
        }
    }
    let n = (side * side) as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}
