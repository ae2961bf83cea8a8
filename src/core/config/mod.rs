//! # Config Module
//!
//! Immutable tuning for the analysis pipeline.
//!
//! Every threshold, window size, kernel reference and blend weight lives in
//! [`AnalyzerConfig`]. The config is built once, validated, and handed to the
//! analyzer at construction; nothing reads ambient globals.
//!
//! ## Example
//! ```rust,ignore
//! let config = AnalyzerConfig::default()
//!     .thresholds(LabelThresholds { verified: 80.0, suspicious: 40.0 });
//! config.validate()?;
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ScannerError;

/// Largest accepted upload (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Complete analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub metadata: MetadataConfig,
    pub noise: NoiseConfig,
    pub edge: EdgeConfig,
    pub compression: CompressionConfig,
    pub weights: FeatureWeights,
    pub thresholds: LabelThresholds,
    pub pdf: PdfConfig,
    /// Uploads above this size are rejected before decoding
    pub max_upload_bytes: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            metadata: MetadataConfig::default(),
            noise: NoiseConfig::default(),
            edge: EdgeConfig::default(),
            compression: CompressionConfig::default(),
            weights: FeatureWeights::default(),
            thresholds: LabelThresholds::default(),
            pdf: PdfConfig::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AnalyzerConfig {
    /// Load a config from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ScannerError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            ScannerError::Config(format!("invalid config file {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the blend weights
    pub fn weights(mut self, weights: FeatureWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Set the label thresholds
    pub fn thresholds(mut self, thresholds: LabelThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Set the noise feature tuning
    pub fn noise(mut self, noise: NoiseConfig) -> Self {
        self.noise = noise;
        self
    }

    /// Set the upload size limit
    pub fn max_upload_bytes(mut self, limit: u64) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    /// Check every section for values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ScannerError> {
        self.weights.validate()?;
        self.thresholds.validate()?;
        self.noise.validate()?;
        self.compression.validate()?;
        self.pdf.validate()?;

        if !(self.edge.variance_threshold > 0.0) {
            return Err(invalid("edge.variance_threshold must be positive"));
        }
        if self.max_upload_bytes == 0 {
            return Err(invalid("max_upload_bytes must be positive"));
        }
        Ok(())
    }
}

/// Penalties applied by the metadata feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Added when no EXIF block is present at all
    pub missing_exif_penalty: f64,
    /// Added when EXIF exists but names no camera make or model
    pub missing_camera_penalty: f64,
    /// Added for RGB content stored in PNG or WEBP
    pub lossless_rgb_penalty: f64,
    /// Added when the EXIF `Software` tag names a known generator
    pub generator_software_penalty: f64,
    /// Lowercase substrings identifying image generators
    pub generator_signatures: Vec<String>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            missing_exif_penalty: 0.3,
            missing_camera_penalty: 0.15,
            lossless_rgb_penalty: 0.1,
            generator_software_penalty: 0.4,
            generator_signatures: [
                "stable diffusion",
                "midjourney",
                "dall-e",
                "dall·e",
                "firefly",
                "imagen",
                "novelai",
                "comfyui",
                "automatic1111",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Tuning for the noise-uniformity feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Candidate window sides, tried largest first
    pub window_sizes: Vec<u32>,
    /// Forces a single window side instead of the adaptive choice
    pub fixed_window: Option<u32>,
    /// Minimum number of full windows the adaptive choice aims for
    pub min_windows: usize,
    /// Coefficient of variation at which uniformity reaches zero
    pub cv_threshold: f64,
    /// Mean window standard deviation (grey levels) treated as real sensor noise
    pub noise_floor: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            window_sizes: vec![32, 16, 8],
            fixed_window: None,
            min_windows: 9,
            cv_threshold: 0.15,
            noise_floor: 8.0,
        }
    }
}

impl NoiseConfig {
    fn validate(&self) -> Result<(), ScannerError> {
        if self.fixed_window.is_none() && self.window_sizes.is_empty() {
            return Err(invalid("noise.window_sizes must not be empty"));
        }
        if self.window_sizes.contains(&0) || self.fixed_window == Some(0) {
            return Err(invalid("noise window sizes must be positive"));
        }
        if !(self.cv_threshold > 0.0) || !(self.noise_floor > 0.0) {
            return Err(invalid("noise.cv_threshold and noise.noise_floor must be positive"));
        }
        Ok(())
    }
}

/// Tuning for the edge-consistency feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// `var / mean²` of the gradient magnitude at which suspicion reaches zero
    pub variance_threshold: f64,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            variance_threshold: 0.25,
        }
    }
}

/// Tuning for the compression-artifact feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Channel standard deviation regarded as a full tonal range
    pub spread_reference: f64,
    /// Number of fullest histogram bins used for peak concentration
    pub peak_bins: usize,
    pub spread_weight: f64,
    pub peak_weight: f64,
    pub gap_weight: f64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            spread_reference: 50.0,
            peak_bins: 8,
            spread_weight: 0.5,
            peak_weight: 0.3,
            gap_weight: 0.2,
        }
    }
}

impl CompressionConfig {
    fn validate(&self) -> Result<(), ScannerError> {
        if !(self.spread_reference > 0.0) {
            return Err(invalid("compression.spread_reference must be positive"));
        }
        if self.peak_bins == 0 || self.peak_bins >= 256 {
            return Err(invalid("compression.peak_bins must be between 1 and 255"));
        }
        let parts = [self.spread_weight, self.peak_weight, self.gap_weight];
        if parts.iter().any(|w| *w < 0.0) {
            return Err(invalid("compression weights must not be negative"));
        }
        if (parts.iter().sum::<f64>() - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(invalid("compression weights must sum to 1.0"));
        }
        Ok(())
    }
}

/// Blend weights for the four feature scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureWeights {
    pub metadata: f64,
    pub noise: f64,
    pub edge: f64,
    pub compression: f64,
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self {
            metadata: 0.2,
            noise: 0.3,
            edge: 0.3,
            compression: 0.2,
        }
    }
}

impl FeatureWeights {
    fn validate(&self) -> Result<(), ScannerError> {
        let all = [self.metadata, self.noise, self.edge, self.compression];
        if all.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err(invalid("feature weights must be finite and non-negative"));
        }
        if (all.iter().sum::<f64>() - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(invalid("feature weights must sum to 1.0"));
        }
        Ok(())
    }
}

/// Authenticity cut-offs for the three labels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelThresholds {
    /// Scores at or above this are "Verified"
    pub verified: f64,
    /// Scores at or above this (and below `verified`) are "Suspicious"
    pub suspicious: f64,
}

impl Default for LabelThresholds {
    fn default() -> Self {
        Self {
            verified: 75.0,
            suspicious: 50.0,
        }
    }
}

impl LabelThresholds {
    fn validate(&self) -> Result<(), ScannerError> {
        if !(0.0..=100.0).contains(&self.suspicious) || !(0.0..=100.0).contains(&self.verified) {
            return Err(invalid("label thresholds must lie within 0-100"));
        }
        if self.suspicious >= self.verified {
            return Err(invalid(
                "the suspicious threshold must be below the verified threshold",
            ));
        }
        Ok(())
    }
}

/// Engine that turns the first PDF page into pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfBackend {
    /// PDFium when the native library loads, embedded images otherwise
    #[default]
    Auto,
    /// Full page rendering (text, vector art, images) through PDFium
    Pdfium,
    /// The page's largest raster image, resampled to the page box
    EmbeddedImages,
}

/// First-page PDF rendering parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Pixels per PDF point (2.0 = 144 dpi)
    pub render_scale: f64,
    /// Cap on the longer side of the rendered page
    pub max_dimension: u32,
    /// Largest width × height accepted for any image on the page.
    /// Checked against the declared size before anything is decompressed.
    pub max_pixels: u64,
    pub backend: PdfBackend,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            render_scale: 2.0,
            max_dimension: 4096,
            max_pixels: 40_000_000,
            backend: PdfBackend::Auto,
        }
    }
}

impl PdfConfig {
    fn validate(&self) -> Result<(), ScannerError> {
        if !(self.render_scale > 0.0) || self.max_dimension == 0 {
            return Err(invalid("pdf.render_scale and pdf.max_dimension must be positive"));
        }
        if self.max_pixels == 0 {
            return Err(invalid("pdf.max_pixels must be positive"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ScannerError {
    ScannerError::Config(message.to_string())
}
