//! Integration tests for request instrumentation.
//!
//! Tests cover:
//! - Response headers on every route
//! - Per-endpoint counters and duration tags
//! - Error counting for rejected and panicking requests

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use shared::storage::SeriesQuery;

use super::common::{get as get_json, get_raw, test_app};

async fn explode() -> &'static str {
    panic!("route exploded")
}

#[tokio::test]
async fn test_headers_present_on_every_route() {
    let (app, _state) = test_app();

    for uri in ["/health", "/status", "/metrics", "/api/overview", "/nope"] {
        let (_, headers, _) = get_raw(app.clone(), uri).await;

        let response_time = headers["x-response-time"].to_str().unwrap();
        let (_, fraction) = response_time.split_once('.').unwrap();
        assert_eq!(fraction.len(), 3, "{uri}: {response_time}");
        assert_eq!(headers["x-request-id"].len(), 8, "{uri}");
    }
}

#[tokio::test]
async fn test_endpoint_counters() {
    let (app, state) = test_app();

    get_json(app.clone(), "/status").await;
    get_json(app.clone(), "/status").await;
    get_json(app, "/api/overview").await;

    let store = state.store();
    assert_eq!(
        store
            .query(&SeriesQuery::new().with_name("api.status.requests"))
            .len(),
        2
    );
    assert_eq!(
        store
            .query(&SeriesQuery::new().with_name("api.api_overview.requests"))
            .len(),
        1
    );

    let durations = store.query(&SeriesQuery::new().with_name("http.request.duration"));
    assert_eq!(durations.len(), 3);
    assert!(durations
        .iter()
        .all(|o| o.tags["status_code"] == "200" && o.tags["status_class"] == "2xx"));
}

#[tokio::test]
async fn test_unmatched_route_is_unknown_endpoint() {
    let (app, state) = test_app();

    let (status, _) = get_json(app, "/does/not/exist").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let durations = state
        .store()
        .query(&SeriesQuery::new().with_name("http.request.duration"));
    assert_eq!(durations[0].tags["endpoint"], "unknown");
    assert_eq!(durations[0].tags["status_class"], "4xx");
}

#[tokio::test]
async fn test_panic_becomes_500_and_error_count() {
    let (_, state) = test_app();
    let app = api::with_middleware(Router::new().route("/explode", get(explode)), &state);

    let (status, body) = get_json(app.clone(), "/explode").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "panic");

    // The process keeps serving after a panic.
    let (status, _) = get_json(app, "/explode").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let errors = state
        .store()
        .query(&SeriesQuery::new().with_name("http.errors.count"));
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|o| o.tags["error_type"] == "panic"));
}

#[tokio::test]
async fn test_slow_request_alert_threshold_suffix() {
    let (app, state) = test_app();

    get_json(app, "/status").await;

    let response_times = state
        .store()
        .query(&SeriesQuery::new().with_name("api.status.response_time"));
    assert_eq!(response_times.len(), 1);
    assert_eq!(response_times[0].suffix(), "response_time");
}
