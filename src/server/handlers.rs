//! Route handlers.

use std::path::Path;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::ApiError;
use crate::core::aggregator::AnalysisResult;
use crate::core::loader::{AnalyzeRequest, DocumentFormat};
use crate::core::pipeline::{Analyzer, CancellationToken};
use crate::events::null_sender;

const SERVICE_NAME: &str = "Document Authenticity Scanner API";
const SUPPORTED_FORMATS: [&str; 4] = ["PDF", "JPG", "PNG", "WEBP"];
const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub analyzer_ready: bool,
    pub supported_formats: [&'static str; 4],
    pub synthid_available: bool,
}

/// `GET /` - service banner
pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "online",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

/// `GET /health` - readiness for monitoring
pub async fn health(State(analyzer): State<Arc<Analyzer>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        analyzer_ready: true,
        supported_formats: SUPPORTED_FORMATS,
        synthid_available: analyzer.watermark_available(),
    })
}

/// `POST /analyze` - analyze the multipart field `file`
pub async fn analyze(
    State(analyzer): State<Arc<Analyzer>>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResult>, ApiError> {
    let mut upload: Option<AnalyzeRequest> = None;

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = resolve_content_type(field.content_type(), &filename);
        let bytes = field.bytes().await.map_err(upload_error)?;
        upload = Some(AnalyzeRequest::new(bytes.to_vec(), content_type, filename));
    }

    let request =
        upload.ok_or_else(|| ApiError::BadRequest("Missing multipart field 'file'".to_string()))?;

    tracing::debug!(
        filename = %request.filename,
        content_type = %request.declared_content_type,
        bytes = request.bytes.len(),
        "received upload"
    );

    let result = run_analysis(analyzer, request).await?;
    Ok(Json(result))
}

/// Run one analysis on the blocking pool.
///
/// If this future is dropped (the client disconnected), the analysis is
/// cancelled and stops at its next stage boundary.
async fn run_analysis(
    analyzer: Arc<Analyzer>,
    request: AnalyzeRequest,
) -> Result<AnalysisResult, ApiError> {
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.drop_guard();

    let result = tokio::task::spawn_blocking(move || {
        analyzer.analyze_with_events(&request, &null_sender(), &cancel)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(result)
}

/// The declared type, or one guessed from the filename when the client
/// sent none (or a generic binary type)
fn resolve_content_type(declared: Option<&str>, filename: &str) -> String {
    match declared {
        Some(ct) if !ct.is_empty() && !ct.eq_ignore_ascii_case(OCTET_STREAM) => ct.to_string(),
        other => DocumentFormat::from_path(Path::new(filename))
            .map(|f| f.mime_type().to_string())
            .unwrap_or_else(|| other.unwrap_or(OCTET_STREAM).to_string()),
    }
}

fn upload_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::Upload {
        status: e.status(),
        message: e.body_text(),
    }
}
