//! # Server Module
//!
//! HTTP front end for the analyzer.
//!
//! ## Routes
//! - `GET /` - service name, version and time
//! - `GET /health` - readiness, supported formats, watermark availability
//! - `POST /analyze` - multipart upload in field `file`, returns the verdict
//!
//! Analysis is CPU-bound, so each request runs on tokio's blocking pool.

mod error;
mod handlers;

pub use error::ApiError;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::core::pipeline::Analyzer;
use crate::error::ScannerError;

/// Headroom for multipart boundaries and headers on top of the file limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the router around a shared analyzer
pub fn router(analyzer: Arc<Analyzer>) -> Router {
    let body_limit = usize::try_from(analyzer.config().max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/analyze", post(handlers::analyze))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(analyzer)
}

/// Serve until Ctrl-C
pub async fn serve(addr: SocketAddr, analyzer: Arc<Analyzer>) -> Result<(), ScannerError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "analysis server listening");

    axum::serve(listener, router(analyzer))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("analysis server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
