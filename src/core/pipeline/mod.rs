//! # Pipeline Module
//!
//! Orchestrates one analysis from upload to verdict.
//!
//! ## Pipeline Stages
//! 1. **Decode** - Check size, resolve the format and decode to RGB
//! 2. **Extract** - Run every registered feature scorer
//! 3. **Aggregate** - Blend scores, label, attach metadata and watermark report
//!
//! ## Parallelism
//! Uses rayon to run the feature scorers concurrently. Results are
//! collected in registration order, so the verdict does not depend on
//! scheduling.

mod executor;

pub use executor::{Analyzer, AnalyzerBuilder, CancelOnDrop, CancellationToken};
