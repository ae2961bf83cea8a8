//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::{ErrorKind, ErrorResponse, ScannerError};

/// Errors surfaced by the HTTP layer
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Scanner(#[from] ScannerError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Upload could not be read: {message}")]
    Upload { status: StatusCode, message: String },

    #[error("Analysis task failed: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Scanner(e) => match e.kind() {
                ErrorKind::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                _ if e.is_client_error() => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upload { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            ApiError::Scanner(e) => ErrorResponse::from(e),
            ApiError::BadRequest(detail) => ErrorResponse {
                detail: detail.clone(),
                kind: ErrorKind::InvalidRequest,
            },
            ApiError::Upload { status, message } => ErrorResponse {
                detail: message.clone(),
                kind: if *status == StatusCode::PAYLOAD_TOO_LARGE {
                    ErrorKind::TooLarge
                } else {
                    ErrorKind::InvalidRequest
                },
            },
            ApiError::Internal(_) => ErrorResponse {
                detail: "Analysis failed".to_string(),
                kind: ErrorKind::Compute,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnalysisError, LoadError};

    #[test]
    fn scanner_errors_map_to_status() {
        let unsupported = ApiError::from(ScannerError::from(LoadError::UnsupportedFormat {
            content_type: "text/plain".to_string(),
        }));
        let too_large = ApiError::from(ScannerError::from(LoadError::TooLarge {
            size: 20,
            limit: 10,
        }));
        let compute = ApiError::from(ScannerError::from(AnalysisError::Compute {
            feature: "edge_consistency".to_string(),
            reason: "nan".to_string(),
        }));

        assert_eq!(unsupported.status(), StatusCode::BAD_REQUEST);
        assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(compute.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(compute.body().detail, "Analysis failed");
    }

    #[test]
    fn missing_renderer_is_service_unavailable() {
        let error = ApiError::from(ScannerError::from(LoadError::RendererUnavailable {
            reason: "PDFium library not found".to_string(),
        }));
        assert_eq!(error.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error.body().kind, ErrorKind::Unavailable);
    }

    #[test]
    fn internal_errors_hide_detail() {
        let error = ApiError::Internal("worker panicked".to_string());
        let body = error.body();
        assert_eq!(body.detail, "Analysis failed");
        assert_eq!(body.kind, ErrorKind::Compute);
    }
}
