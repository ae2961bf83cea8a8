//! # Document Authenticity Scanner
//!
//! Estimates whether an uploaded image or PDF is camera-captured or
//! AI-generated from a handful of forensic signals.
//!
//! ## Core Philosophy
//! - **Heuristic, not proof** - every verdict carries a confidence and a breakdown
//! - **Show WHY** - each feature's contribution is reported and explained
//! - **One outcome per request** - a full result or a single classified error
//!
//! ## Architecture
//! The library is split into a core engine and thin front ends:
//! - `core` - Loading, feature scoring, aggregation
//! - `events` - Event-driven progress reporting
//! - `error` - Classified, user-facing error types
//! - `server` - HTTP service

pub mod core;
pub mod error;
pub mod events;
pub mod server;

// Re-export commonly used types at the crate root
pub use crate::core::aggregator::{AnalysisResult, Label};
pub use crate::core::config::AnalyzerConfig;
pub use crate::core::loader::AnalyzeRequest;
pub use crate::core::pipeline::{Analyzer, CancellationToken};
pub use error::{Result, ScannerError};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. Logs go to stderr
/// so JSON output on stdout stays clean. `RUST_LOG` controls the filter
/// (default `warn`).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    // A subscriber may already be installed (e.g. by a test harness)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
