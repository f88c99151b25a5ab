//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality used across all integration tests,
//! including test app setup, HTTP request helpers and throwaway sibling servers.

use api::{create_router, AppState};
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use shared::config::MonitoringConfig;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Creates a test router with a fresh state and no registered checks.
///
/// # Returns
///
/// A tuple containing the configured router and the app state.
pub fn test_app() -> (Router, AppState) {
    test_app_with(AppState::with_defaults())
}

/// Creates a test router around the given state.
pub fn test_app_with(state: AppState) -> (Router, AppState) {
    let router = create_router(state.clone());
    (router, state)
}

/// Creates a state whose configuration has no sibling servers.
pub fn isolated_state() -> AppState {
    AppState::new(shared::MonitoringContext::new(MonitoringConfig {
        servers: std::collections::BTreeMap::new(),
        ..MonitoringConfig::default()
    }))
}

/// Helper to make a GET request and read the raw response.
///
/// # Returns
///
/// A tuple containing the status code, response headers and body text.
pub async fn get_raw(app: Router, uri: &str) -> (StatusCode, HeaderMap, String) {
    let response = tower::ServiceExt::oneshot(
        app,
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8_lossy(&body_bytes).into_owned())
}

/// Helper to make a GET request.
///
/// # Returns
///
/// A tuple containing the response status code and parsed JSON response body.
pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = get_raw(app, uri).await;
    let json: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    (status, json)
}

/// Serves `router` on an ephemeral loopback port.
///
/// # Returns
///
/// The base URL of the server, e.g. `http://127.0.0.1:43210`.
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
