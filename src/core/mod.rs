//! # Core Module
//!
//! The transport-agnostic analysis engine.
//!
//! ## Modules
//! - `loader` - Decodes uploads (PDF first page, JPEG, PNG, WEBP) to RGB
//! - `metadata` - Extracts EXIF fields from the raw bytes
//! - `features` - Metadata, noise, edge and compression scorers
//! - `aggregator` - Blends scores into a labelled verdict
//! - `reporter` - Explains verdicts in plain words
//! - `pipeline` - Orchestrates the full workflow
//! - `config` - Tunables for all of the above

pub mod aggregator;
pub mod config;
pub mod features;
pub mod loader;
pub mod metadata;
pub mod pipeline;
pub mod reporter;

// Re-export commonly used types
pub use aggregator::{AnalysisResult, FeatureBreakdown, Label};
pub use features::{FeatureKind, FeatureScore, FeatureScorer};
pub use loader::{AnalyzeRequest, DecodedDocument, DocumentFormat};
pub use metadata::EmbeddedMetadata;
pub use reporter::{explain, VerdictExplanation};
