//! # Features Module
//!
//! Forensic signals computed from a decoded document.
//!
//! ## Scorers
//! - **Metadata** - missing camera EXIF, lossless RGB, generator software tags
//! - **Noise** - coefficient of variation of window variances
//! - **Edge** - spread of the Sobel gradient magnitude
//! - **Compression** - histogram peaks, narrow range and re-quantization gaps
//!
//! Every scorer implements [`FeatureScorer`] and returns a suspicion value in
//! [0, 1]. Watermark detection sits behind [`WatermarkDetector`] and is
//! currently a stub.

mod compression;
mod edge;
mod metadata;
mod noise;
mod traits;
mod watermark;

pub use compression::{ChannelSignals, CompressionScorer};
pub use edge::{EdgeScorer, GradientStats};
pub use metadata::MetadataScorer;
pub use noise::{NoiseScorer, NoiseStats};
pub use traits::{FeatureKind, FeatureScore, FeatureScorer, NEUTRAL_SCORE};
pub use watermark::{SynthIdStub, WatermarkDetector, WatermarkReport};

use crate::core::config::AnalyzerConfig;

/// A scorer together with its blend weight
pub struct WeightedScorer {
    pub scorer: Box<dyn FeatureScorer>,
    pub weight: f64,
}

impl WeightedScorer {
    pub fn new(scorer: Box<dyn FeatureScorer>, weight: f64) -> Self {
        Self { scorer, weight }
    }
}

/// The four standard scorers, weighted and tuned from `config`
pub fn default_scorers(config: &AnalyzerConfig) -> Vec<WeightedScorer> {
    vec![
        WeightedScorer::new(
            Box::new(MetadataScorer::new(config.metadata.clone())),
            config.weights.metadata,
        ),
        WeightedScorer::new(
            Box::new(NoiseScorer::new(config.noise.clone())),
            config.weights.noise,
        ),
        WeightedScorer::new(
            Box::new(EdgeScorer::new(config.edge.clone())),
            config.weights.edge,
        ),
        WeightedScorer::new(
            Box::new(CompressionScorer::new(config.compression.clone())),
            config.weights.compression,
        ),
    ]
}
