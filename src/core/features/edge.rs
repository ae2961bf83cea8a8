//! Edge consistency scoring.
//!
//! Applies 3×3 Sobel kernels to the luminance channel and looks at how much
//! the gradient magnitude varies. Texture and genuine detail in photographs
//! give a heavy-tailed magnitude distribution; over-smoothed synthetic output
//! gives a narrow one.
//!
//! Borders are handled by replicating the edge pixels, so a flat image has a
//! magnitude of exactly zero everywhere. Images without a full 3×3
//! neighbourhood score neutral.

use image::GrayImage;
use rayon::prelude::*;

use crate::core::config::EdgeConfig;
use crate::core::loader::DecodedDocument;
use crate::error::AnalysisError;

use super::traits::{FeatureKind, FeatureScore, FeatureScorer};

const SOBEL_X: [[f64; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_Y: [[f64; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];
const KERNEL_SIDE: u32 = 3;

/// Summary of the gradient magnitude map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStats {
    pub mean: f64,
    pub variance: f64,
}

impl GradientStats {
    /// `variance / mean²`, or `None` for an all-zero map
    pub fn normalized_spread(&self) -> Option<f64> {
        (self.mean > f64::EPSILON).then(|| self.variance / (self.mean * self.mean))
    }
}

/// Scores how uniform the edge strength is
#[derive(Debug, Clone, Default)]
pub struct EdgeScorer {
    config: EdgeConfig,
}

impl EdgeScorer {
    pub fn new(config: EdgeConfig) -> Self {
        Self { config }
    }

    /// Mean and variance of the Sobel gradient magnitude.
    ///
    /// Rows are convolved in parallel; the per-row partial sums are reduced
    /// in row order so the result does not depend on thread scheduling.
    pub fn gradient_stats(&self, luma: &GrayImage) -> GradientStats {
        let (width, height) = luma.dimensions();
        if width == 0 || height == 0 {
            return GradientStats {
                mean: 0.0,
                variance: 0.0,
            };
        }

        let rows: Vec<(f64, f64)> = (0..height)
            .into_par_iter()
            .map(|y| {
                let mut sum = 0.0;
                let mut sum_sq = 0.0;
                for x in 0..width {
                    let magnitude = sobel_magnitude(luma, x, y);
                    sum += magnitude;
                    sum_sq += magnitude * magnitude;
                }
                (sum, sum_sq)
            })
            .collect();

        let (sum, sum_sq) = rows
            .iter()
            .fold((0.0, 0.0), |(s, q), (rs, rq)| (s + rs, q + rq));
        let n = width as f64 * height as f64;
        let mean = sum / n;
        GradientStats {
            mean,
            variance: (sum_sq / n - mean * mean).max(0.0),
        }
    }

    /// Suspicion for a luminance map, or `None` when it is smaller than the kernel
    fn score_luma(&self, luma: &GrayImage) -> Option<f64> {
        let (width, height) = luma.dimensions();
        if width < KERNEL_SIDE || height < KERNEL_SIDE {
            return None;
        }
        let stats = self.gradient_stats(luma);
        tracing::trace!(mean = stats.mean, variance = stats.variance, "gradient statistics");
        Some(self.score_stats(&stats))
    }

    fn score_stats(&self, stats: &GradientStats) -> f64 {
        match stats.normalized_spread() {
            Some(spread) => 1.0 - (spread / self.config.variance_threshold).min(1.0),
            // No gradient anywhere: as smooth as an image gets
            None => 1.0,
        }
    }
}

impl FeatureScorer for EdgeScorer {
    fn kind(&self) -> FeatureKind {
        FeatureKind::EdgeConsistency
    }

    fn score(&self, document: &DecodedDocument) -> Result<FeatureScore, AnalysisError> {
        match self.score_luma(document.luminance()) {
            Some(value) => FeatureScore::checked(self.kind(), value),
            None => Ok(FeatureScore::neutral()),
        }
    }
}

/// Gradient magnitude at (x, y) with edge-replicate padding
fn sobel_magnitude(luma: &GrayImage, x: u32, y: u32) -> f64 {
    let (width, height) = luma.dimensions();
    let mut gx = 0.0;
    let mut gy = 0.0;
    for (ky, dy) in (-1i64..=1).enumerate() {
        let sy = (y as i64 + dy).clamp(0, height as i64 - 1) as u32;
        for (kx, dx) in (-1i64..=1).enumerate() {
            let sx = (x as i64 + dx).clamp(0, width as i64 - 1) as u32;
            let v = luma.get_pixel(sx, sy)[0] as f64;
            gx += SOBEL_X[ky][kx] * v;
            gy += SOBEL_Y[ky][kx] * v;
        }
    }
    (gx * gx + gy * gy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loader::{ColorMode, DocumentFormat};
    use crate::core::metadata::EmbeddedMetadata;
    use image::{ImageBuffer, Luma, Rgb, RgbImage};

    fn uniform(value: u8, size: u32) -> GrayImage {
        ImageBuffer::from_fn(size, size, |_, _| Luma([value]))
    }

    #[test]
    fn flat_image_has_no_gradient() {
        let scorer = EdgeScorer::default();
        let stats = scorer.gradient_stats(&uniform(90, 32));
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.normalized_spread(), None);
        assert_eq!(scorer.score_stats(&stats), 1.0);
    }

    #[test]
    fn vertical_step_has_known_magnitude() {
        let step: GrayImage = ImageBuffer::from_fn(8, 8, |x, _| Luma([if x < 4 { 0 } else { 100 }]));
        assert_eq!(sobel_magnitude(&step, 4, 4), 400.0);
        assert_eq!(sobel_magnitude(&step, 3, 4), 400.0);
        assert_eq!(sobel_magnitude(&step, 1, 4), 0.0);
    }

    #[test]
    fn linear_ramp_is_uniformly_smooth() {
        // Constant slope inside, replicate padding only dents the border
        let ramp: GrayImage = ImageBuffer::from_fn(64, 64, |x, _| Luma([(x * 2) as u8]));
        let scorer = EdgeScorer::default();
        let value = scorer.score_stats(&scorer.gradient_stats(&ramp));
        assert!(value > 0.8, "ramp scored {value}");
    }

    #[test]
    fn isolated_edges_are_natural() {
        // Sparse strong edges on a flat background: heavy-tailed magnitudes
        let grid: GrayImage = ImageBuffer::from_fn(64, 64, |x, y| {
            Luma([if x % 16 == 0 || y % 16 == 0 { 255 } else { 20 }])
        });
        let scorer = EdgeScorer::default();
        assert_eq!(scorer.score_stats(&scorer.gradient_stats(&grid)), 0.0);
    }

    #[test]
    fn images_smaller_than_kernel_are_neutral() {
        let scorer = EdgeScorer::default();
        let checker = |w, h| -> GrayImage {
            ImageBuffer::from_fn(w, h, |x, y| Luma([if (x + y) % 2 == 0 { 0 } else { 255 }]))
        };

        for (w, h) in [(1, 1), (2, 2), (2, 1), (2, 40), (40, 2)] {
            assert_eq!(scorer.score_luma(&checker(w, h)), None, "{w}x{h}");
        }
        assert!(scorer.score_luma(&checker(3, 3)).is_some());
    }

    #[test]
    fn tiny_document_scores_neutral() {
        let pixels = RgbImage::from_fn(2, 2, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let document = DecodedDocument::new(
            pixels,
            DocumentFormat::Png,
            ColorMode::Rgb,
            EmbeddedMetadata::default(),
            "tiny.png",
            64,
        );
        let score = EdgeScorer::default().score(&document).unwrap();
        assert_eq!(score.value(), 0.5);
    }
}
