//! Health check endpoint.
//!
//! Runs every registered health check and answers 200 when all of them pass,
//! 503 otherwise.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use shared::models::HealthReport;
use std::sync::Arc;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `unhealthy`.
    pub status: &'static str,
    /// Aggregated check results.
    #[serde(flatten)]
    pub report: HealthReport,
    /// Static facts about this process.
    pub server_info: ServerInfo,
}

/// Process facts included in the health response.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Seconds since startup.
    pub uptime: f64,
    /// Always true for this server.
    pub monitoring_enabled: bool,
}

/// Creates the health check routes.
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}

/// Health check handler.
///
/// Checks are synchronous and may block, so they run on the blocking pool.
async fn health_check(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<HealthResponse>), ApiError> {
    let registry = Arc::clone(state.registry());
    let report = tokio::task::spawn_blocking(move || registry.run_all()).await?;

    let (code, status) = if report.overall_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    Ok((
        code,
        Json(HealthResponse {
            status,
            report,
            server_info: ServerInfo {
                service: "lookout",
                version: env!("CARGO_PKG_VERSION"),
                uptime: state.uptime().as_secs_f64(),
                monitoring_enabled: true,
            },
        }),
    ))
}
