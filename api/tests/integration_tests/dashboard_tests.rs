//! Integration tests for the dashboard endpoints.
//!
//! Tests cover:
//! - Overview numbers derived from instrumented traffic
//! - Health view classification
//! - Best-effort server status calls against loopback servers

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use shared::config::{MonitoringConfig, ServerConfig};
use shared::models::{ServerHealthRecord, ServerStatus};
use shared::MonitoringContext;
use std::collections::BTreeMap;

use super::common::{get as get_json, isolated_state, spawn_server, test_app, test_app_with};

#[tokio::test]
async fn test_overview_reflects_traffic() {
    let (app, state) = test_app_with(isolated_state());

    get_json(app.clone(), "/status").await;
    get_json(app.clone(), "/metrics?format=bogus").await;

    let (status, overview) = get_json(app, "/api/overview").await;

    assert_eq!(status, StatusCode::OK);
    // The overview request is counted after its handler returns.
    assert_eq!(overview["total_requests"], 2);
    assert_eq!(overview["error_rate"], 0.5);
    assert!(overview["avg_response_time"].as_f64().unwrap() >= 0.0);
    assert_eq!(overview["total_servers"], 0);
    assert_eq!(overview["system_health"], "healthy");
    assert!(!state.store().is_empty());
}

#[tokio::test]
async fn test_health_view_degraded() {
    let (app, state) = test_app();
    state
        .health()
        .upsert(ServerHealthRecord::new("kali", ServerStatus::Healthy, 0.05));
    state.health().upsert(
        ServerHealthRecord::new("perplexity", ServerStatus::Unhealthy, 0.2).with_error("HTTP 500"),
    );

    let (status, view) = get_json(app, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["overall_status"], "degraded");
    assert_eq!(view["servers"]["perplexity"]["error_message"], "HTTP 500");
}

#[tokio::test]
async fn test_servers_mixes_reachable_and_unreachable() {
    let sibling = Router::new().route(
        "/status",
        get(|| async { Json(json!({"server_name": "kali-server", "status": "running"})) }),
    );
    let url = spawn_server(sibling).await;

    let config = MonitoringConfig {
        servers: BTreeMap::from([
            ("kali".to_string(), ServerConfig::http(url)),
            (
                "gone".to_string(),
                ServerConfig::http("http://127.0.0.1:1"),
            ),
        ]),
        status_timeout_secs: 2,
        ..MonitoringConfig::default()
    };
    let (app, _) = test_app_with(api::AppState::new(MonitoringContext::new(config)));

    let (status, servers) = get_json(app, "/api/servers").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(servers["kali"]["server_name"], "kali-server");
    assert_eq!(servers["gone"]["status"], "unreachable");
    assert!(servers["gone"]["error"].is_string());
}

#[tokio::test]
async fn test_alerts_on_error_rate() {
    let (app, _) = test_app_with(isolated_state());

    get_json(app.clone(), "/metrics?format=bogus").await;

    let (_, alerts) = get_json(app, "/api/alerts").await;

    assert_eq!(alerts["count"], 1);
    assert_eq!(alerts["alerts"][0]["severity"], "warning");
    assert!(alerts["alerts"][0]["message"]
        .as_str()
        .unwrap()
        .starts_with("High error rate"));
}

#[tokio::test]
async fn test_metrics_view_default_range() {
    let (app, state) = test_app();
    state
        .store()
        .record("tool.nmap.execution_time", 2.5, [("tool", "nmap")]);

    let (_, view) = get_json(app, "/api/metrics").await;

    assert_eq!(view["time_range"], "1h");
    assert_eq!(view["metrics"]["tools"][0]["value"], 2.5);
}
