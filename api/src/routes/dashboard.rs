//! Dashboard JSON endpoints.

use crate::dashboard::{AlertsView, HealthView, MetricsView, Overview, TimeRange};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Query parameters for `/api/metrics`.
#[derive(Debug, Deserialize)]
pub struct RangeParams {
    /// `5m`, `15m`, `1h`, `6h` or `24h`; anything else means `1h`.
    pub range: Option<String>,
}

/// Creates the dashboard routes.
pub fn dashboard_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/overview", get(overview))
        .route("/api/health", get(health))
        .route("/api/servers", get(servers))
        .route("/api/alerts", get(alerts))
        .route("/api/metrics", get(metrics))
        .with_state(state)
}

async fn overview(State(state): State<AppState>) -> Json<Overview> {
    Json(state.dashboard().overview())
}

async fn health(State(state): State<AppState>) -> Json<HealthView> {
    Json(state.dashboard().health())
}

async fn servers(State(state): State<AppState>) -> Json<BTreeMap<String, Value>> {
    Json(state.dashboard().servers().await)
}

async fn alerts(State(state): State<AppState>) -> Json<AlertsView> {
    Json(state.dashboard().alerts())
}

async fn metrics(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Json<MetricsView> {
    let range = TimeRange::parse_or_default(params.range.as_deref());
    Json(state.dashboard().metrics(range))
}
