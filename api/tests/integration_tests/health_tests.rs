//! Integration tests for the health endpoint.
//!
//! Tests cover:
//! - Aggregation of registered checks into 200/503
//! - Isolation of failing and panicking checks
//! - Observations recorded for every check run

use axum::http::StatusCode;
use shared::models::CheckReport;
use shared::storage::SeriesQuery;

use super::common::{get, test_app};

#[tokio::test]
async fn test_health_without_checks_is_healthy() {
    let (app, _state) = test_app();

    let (status, response) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["overall_healthy"], true);
    assert!(response["checks"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn test_one_failing_check_makes_service_unavailable() {
    let (app, state) = test_app();
    state
        .registry()
        .register("always_healthy", || Ok(CheckReport::healthy()));
    state
        .registry()
        .register("always_fails", || anyhow::bail!("backend offline"));

    let (status, response) = get(app, "/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response["overall_healthy"], false);
    assert_eq!(response["checks"].as_object().unwrap().len(), 2);
    assert_eq!(response["checks"]["always_healthy"]["healthy"], true);
    assert_eq!(response["checks"]["always_fails"]["healthy"], false);
    assert_eq!(response["checks"]["always_fails"]["error"], "backend offline");
}

#[tokio::test]
async fn test_panicking_check_is_isolated() {
    let (app, state) = test_app();
    state.registry().register("panics", || panic!("check blew up"));
    state.registry().register("fine", || {
        Ok(CheckReport::healthy().with_detail("answer", 42))
    });

    let (status, response) = get(app, "/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response["checks"]["panics"]["healthy"], false);
    assert!(response["checks"]["panics"]["error"]
        .as_str()
        .unwrap()
        .contains("check blew up"));
    assert_eq!(response["checks"]["fine"]["answer"], 42);
}

#[tokio::test]
async fn test_check_details_and_duration_are_reported() {
    let (app, state) = test_app();
    state.registry().register("disk", || {
        Ok(CheckReport::from_bool(true).with_detail("disk_percent", 12.5))
    });

    let (_, response) = get(app, "/health").await;
    let entry = &response["checks"]["disk"];

    assert_eq!(entry["disk_percent"], 12.5);
    assert!(entry["check_duration"].as_f64().unwrap() >= 0.0);
    assert!(entry["timestamp"].is_string());
}

#[tokio::test]
async fn test_check_runs_record_observations() {
    let (app, state) = test_app();
    state
        .registry()
        .register("db", || Ok(CheckReport::unhealthy()));

    get(app, "/health").await;

    let status = state
        .store()
        .query(&SeriesQuery::new().with_name("health_check.db.status"));
    assert_eq!(status.len(), 1);
    assert!(status[0].value.abs() < f64::EPSILON);
    assert_eq!(
        state
            .store()
            .query(&SeriesQuery::new().with_name("health_check.db.duration"))
            .len(),
        1
    );
}

#[tokio::test]
async fn test_re_registering_replaces_check() {
    let (app, state) = test_app();
    state
        .registry()
        .register("cache", || anyhow::bail!("cold"));
    state
        .registry()
        .register("cache", || Ok(CheckReport::healthy()));

    let (status, response) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["checks"].as_object().unwrap().len(), 1);
}
