//! Integration tests for metrics export and status.
//!
//! Tests cover:
//! - Prometheus and JSON export through the full router
//! - Rejection of unknown formats
//! - The status endpoint's summary statistics

use axum::http::{header, StatusCode};
use serde_json::Value;
use shared::models::Observation;

use super::common::{get, get_raw, test_app};

#[tokio::test]
async fn test_prometheus_export_has_single_preamble() {
    let (app, state) = test_app();
    state.store().append(Observation::new("a.b.c", 10.0));
    state.store().append(Observation::new("a.b.c", 20.0));
    state
        .store()
        .append(Observation::new("x-y.z", 5.0).with_tag("host", "scanner"));

    let (status, headers, body) = get_raw(app, "/metrics?format=prometheus").await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(body.matches("# HELP").count(), 1);
    assert_eq!(body.matches("# TYPE").count(), 1);

    // The export request's own http.requests.started is the third name.
    let data: Vec<&str> = body.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(data.len(), 3);
    assert!(data
        .iter()
        .any(|l| l.starts_with("notyyet_http_requests_started{")));
    assert!(data.contains(&"notyyet_a_b_c 20"));
    assert!(data.contains(&"notyyet_x_y_z{host=\"scanner\"} 5"));
}

#[tokio::test]
async fn test_json_export_counts_retained_observations() {
    let (app, state) = test_app();
    for i in 0..5 {
        state
            .store()
            .append(Observation::new("queue.depth", f64::from(i * 10)));
    }

    let (status, headers, body) = get_raw(app, "/metrics?format=json").await;
    let json: Value = serde_json::from_str(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .contains("application/json"));
    // The export request's own http.requests.started is already retained.
    assert_eq!(json["metrics"].as_array().unwrap().len(), 6);

    let summary = &json["summary"]["queue.depth"];
    assert_eq!(summary["count"], 5);
    assert_eq!(summary["min"], 0.0);
    assert_eq!(summary["max"], 40.0);
    assert_eq!(summary["avg"], 20.0);
    assert_eq!(summary["latest"], 40.0);
}

#[tokio::test]
async fn test_unknown_format_is_rejected_and_counted() {
    let (app, state) = test_app();

    let (status, response) = get(app.clone(), "/metrics?format=yaml").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "invalid_argument");

    let errors = state
        .store()
        .query(&shared::storage::SeriesQuery::new().with_name("http.errors.count"));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].tags["endpoint"], "metrics");
}

#[tokio::test]
async fn test_status_reports_uptime_and_health_table() {
    let (app, state) = test_app();
    state.health().upsert(shared::models::ServerHealthRecord::new(
        "perplexity",
        shared::models::ServerStatus::Unreachable,
        10.0,
    ));

    let (status, response) = get(app, "/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "running");
    assert!(response["version"].is_string());
    assert_eq!(response["monitoring_enabled"], true);
    assert_eq!(
        response["health_status"]["perplexity"]["status"],
        "unreachable"
    );
}
