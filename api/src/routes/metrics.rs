//! Metrics export endpoint.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use shared::export::ExportFormat;

/// Query parameters for `/metrics`.
#[derive(Debug, Deserialize)]
pub struct MetricsParams {
    /// `prometheus` (default) or `json`.
    pub format: Option<String>,
}

/// Creates the metrics routes.
pub fn metrics_routes(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(export_metrics))
        .with_state(state)
}

async fn export_metrics(
    State(state): State<AppState>,
    Query(params): Query<MetricsParams>,
) -> Result<Response, ApiError> {
    let format = match params.format.as_deref() {
        Some(name) => name.parse::<ExportFormat>()?,
        None => ExportFormat::default(),
    };

    let body = state.exporter().export(format)?;
    Ok(([(header::CONTENT_TYPE, format.content_type())], body).into_response())
}
