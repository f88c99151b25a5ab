//! Integration tests for sibling server probes and the collection loop.
//!
//! Tests cover:
//! - Classification of real HTTP responses into health records
//! - Timeouts and refused connections becoming `unreachable`
//! - A collection tick updating the health table and store

use api::collector::{CollectionScheduler, Collector, SchedulerTiming, ServerProber};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use shared::config::{MonitoringConfig, ServerConfig};
use shared::models::ServerStatus;
use shared::storage::SeriesQuery;
use shared::MonitoringContext;
use std::collections::BTreeMap;
use std::time::Duration;

use super::common::spawn_server;

fn prober(timeout: Duration) -> ServerProber {
    ServerProber::new(reqwest::Client::new(), timeout)
}

#[tokio::test]
async fn test_healthy_server_with_tools() {
    let url = spawn_server(Router::new().route(
        "/health",
        get(|| async {
            Json(json!({
                "status": "healthy",
                "tools_status": {"nmap": true, "gobuster": false}
            }))
        }),
    ))
    .await;

    let record = prober(Duration::from_secs(2))
        .probe("kali", &ServerConfig::http(url))
        .await;

    assert_eq!(record.status, ServerStatus::Healthy);
    assert!(record.error_message.is_none());
    assert!(record.response_time >= 0.0);
    assert_eq!(record.tool_availability.get("nmap"), Some(&true));
    assert_eq!(record.tool_availability.get("gobuster"), Some(&false));
}

#[tokio::test]
async fn test_unhealthy_body_and_error_status() {
    let url = spawn_server(
        Router::new()
            .route(
                "/degraded/health",
                get(|| async { Json(json!({"status": "degraded"})) }),
            )
            .route(
                "/broken/health",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
            )
            .route("/garbled/health", get(|| async { "not json" })),
    )
    .await;
    let prober = prober(Duration::from_secs(2));

    let degraded = prober
        .probe("a", &ServerConfig::http(format!("{url}/degraded")))
        .await;
    assert_eq!(degraded.status, ServerStatus::Unhealthy);

    let broken = prober
        .probe("b", &ServerConfig::http(format!("{url}/broken/")))
        .await;
    assert_eq!(broken.status, ServerStatus::Unhealthy);
    assert_eq!(broken.error_message.as_deref(), Some("HTTP 503"));

    let garbled = prober
        .probe("c", &ServerConfig::http(format!("{url}/garbled")))
        .await;
    assert_eq!(garbled.status, ServerStatus::Unhealthy);
    assert!(garbled.error_message.is_some());
}

#[tokio::test]
async fn test_timeout_is_unreachable() {
    let url = spawn_server(Router::new().route(
        "/health",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"status": "healthy"}))
        }),
    ))
    .await;

    let record = prober(Duration::from_secs(1))
        .probe("slow", &ServerConfig::http(url))
        .await;

    assert_eq!(record.status, ServerStatus::Unreachable);
    assert!(
        (0.9..2.0).contains(&record.response_time),
        "response_time {}",
        record.response_time
    );
    assert!(record.error_message.is_some());
}

#[tokio::test]
async fn test_refused_connection_is_unreachable() {
    let record = prober(Duration::from_secs(2))
        .probe("gone", &ServerConfig::http("http://127.0.0.1:1"))
        .await;

    assert_eq!(record.status, ServerStatus::Unreachable);
    assert!(record.error_message.is_some());
}

#[tokio::test]
async fn test_tick_updates_health_table() {
    let url = spawn_server(Router::new().route(
        "/health",
        get(|| async { Json(json!({"overall_healthy": true})) }),
    ))
    .await;

    let context = MonitoringContext::new(MonitoringConfig {
        servers: BTreeMap::from([
            ("kali".to_string(), ServerConfig::http(url)),
            ("mcp".to_string(), ServerConfig::local()),
        ]),
        probe_timeout_secs: 2,
        ..MonitoringConfig::default()
    });
    let collector = Collector::new(context.clone(), reqwest::Client::new());

    let report = collector.tick().await.unwrap();

    assert_eq!(report.servers_probed, 2);
    assert_eq!(context.health().healthy_count(), 2);

    let health = context
        .store()
        .query(&SeriesQuery::new().with_name("server.kali.health"));
    assert_eq!(health.len(), 1);
    assert_eq!(health[0].tags["status"], "healthy");
    assert_eq!(
        context
            .store()
            .query(&SeriesQuery::new().with_name("server.kali.response_time"))
            .len(),
        1
    );
}

#[tokio::test]
async fn test_scheduler_stop_is_bounded() {
    let url = spawn_server(Router::new().route(
        "/health",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Json(json!({"status": "healthy"}))
        }),
    ))
    .await;

    let context = MonitoringContext::new(MonitoringConfig {
        servers: BTreeMap::from([("stuck".to_string(), ServerConfig::http(url))]),
        probe_timeout_secs: 20,
        ..MonitoringConfig::default()
    });
    let timing = SchedulerTiming {
        interval: Duration::from_millis(10),
        error_backoff: Duration::from_millis(10),
        shutdown_timeout: Duration::from_millis(300),
    };
    let mut scheduler = CollectionScheduler::new(
        Collector::new(context, reqwest::Client::new()),
        timing,
    );

    scheduler.start();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = std::time::Instant::now();
    let joined = scheduler.stop().await;

    assert!(!joined);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!scheduler.is_running());
}
