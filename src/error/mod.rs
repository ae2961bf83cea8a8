//! # Error Module
//!
//! Error types for the authenticity scanner.
//!
//! ## Design Principles
//! - **Never panic** on uploaded data - return errors instead
//! - **One outcome per request** - no partial results, no internal retries
//! - **Classify for the caller** - every error maps to a client or server fault
//! - **User-friendly messages** - the `detail` text is shown verbatim

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum ScannerError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while turning an upload into a decoded document
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Unsupported file type: {content_type}. Supported: PDF, JPG, PNG, WEBP")]
    UnsupportedFormat { content_type: String },

    #[error("Failed to decode {format} document: {reason}")]
    Decode { format: String, reason: String },

    #[error("PDF has no pages")]
    NoPages,

    #[error("File too large: {size} bytes (maximum is {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },

    #[error("Image too large: {width}x{height} pixels (maximum is {limit} pixels)")]
    TooManyPixels { width: u32, height: u32, limit: u64 },

    #[error("PDF renderer unavailable: {reason}")]
    RendererUnavailable { reason: String },
}

/// Errors raised while scoring an already-decoded document
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Analysis failed in {feature}: {reason}")]
    Compute { feature: String, reason: String },

    #[error("Analysis was cancelled")]
    Cancelled,
}

/// Coarse error classification used by transport layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FormatUnsupported,
    Decode,
    TooLarge,
    Compute,
    Cancelled,
    Config,
    Io,
    /// Malformed request at the transport layer (e.g. missing upload field)
    InvalidRequest,
    /// A required native component (the PDF renderer) is missing
    Unavailable,
}

impl ScannerError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScannerError::Load(LoadError::UnsupportedFormat { .. }) => ErrorKind::FormatUnsupported,
            ScannerError::Load(LoadError::Decode { .. }) | ScannerError::Load(LoadError::NoPages) => {
                ErrorKind::Decode
            }
            ScannerError::Load(LoadError::TooLarge { .. })
            | ScannerError::Load(LoadError::TooManyPixels { .. }) => ErrorKind::TooLarge,
            ScannerError::Load(LoadError::RendererUnavailable { .. }) => ErrorKind::Unavailable,
            ScannerError::Analysis(AnalysisError::Compute { .. }) => ErrorKind::Compute,
            ScannerError::Analysis(AnalysisError::Cancelled) => ErrorKind::Cancelled,
            ScannerError::Config(_) => ErrorKind::Config,
            ScannerError::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether the fault lies with the uploaded input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::FormatUnsupported | ErrorKind::Decode | ErrorKind::TooLarge
        )
    }
}

/// Structured error body returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub detail: String,
    /// Machine-readable classification
    pub kind: ErrorKind,
}

impl From<&ScannerError> for ErrorResponse {
    fn from(error: &ScannerError) -> Self {
        let detail = match error.kind() {
            // Compute faults are reported generically; the cause goes to the log
            ErrorKind::Compute => "Analysis failed".to_string(),
            _ => error.to_string(),
        };
        Self {
            detail,
            kind: error.kind(),
        }
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, ScannerError>;
