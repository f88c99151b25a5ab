//! Process status endpoint.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use shared::export::MetricSummary;
use shared::models::ServerHealthRecord;
use std::collections::BTreeMap;

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Name of this server.
    pub server_name: &'static str,
    /// Server version.
    pub version: &'static str,
    /// Always `running` when the endpoint answers.
    pub status: &'static str,
    /// Seconds since startup.
    pub uptime: f64,
    /// Always true for this server.
    pub monitoring_enabled: bool,
    /// Observations currently retained.
    pub retained_observations: usize,
    /// Per-name statistics over the summary window.
    pub metrics_summary: BTreeMap<String, MetricSummary>,
    /// Latest probe record per sibling server.
    pub health_status: BTreeMap<String, ServerHealthRecord>,
}

/// Creates the status routes.
pub fn status_routes(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .with_state(state)
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        server_name: "lookout",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        uptime: state.uptime().as_secs_f64(),
        monitoring_enabled: true,
        retained_observations: state.store().len(),
        metrics_summary: state.exporter().summary(),
        health_status: state.health().snapshot(),
    })
}
