//! Lookout API Server
//!
//! This crate provides the HTTP surface of the Lookout monitoring subsystem:
//! health, metrics export, status and dashboard endpoints, request
//! instrumentation, and the background collector that samples the host and
//! probes sibling servers.
//!
//! # Architecture
//!
//! The server is built on Axum and Tokio:
//! - Every request passes through the instrumentation middleware, which
//!   records timing observations and sets `X-Response-Time`/`X-Request-ID`
//! - Handler panics are caught and turned into 500 responses
//! - A single background task runs the collection loop until shutdown
//!
//! # Example
//!
//! ```no_run
//! use api::run_server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collector;
mod config;
pub mod dashboard;
pub mod error;
pub mod middleware;
mod routes;
mod state;

pub use collector::CollectionScheduler;
pub use config::{Config, LogFormat};
pub use state::AppState;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

/// Runs the Lookout API server.
///
/// This function initializes the server with configuration from environment variables
/// and starts listening for incoming connections. It handles graceful shutdown on
/// SIGTERM/SIGINT signals.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    run_server_with_config(config).await
}

/// Runs the Lookout API server with the provided configuration.
///
/// The collection scheduler is started once the listener is bound and is
/// stopped, with a bounded wait, after the server has drained.
///
/// # Errors
///
/// Returns an error if:
/// - The monitoring config file cannot be read or is invalid
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server_with_config(config: Config) -> Result<()> {
    let addr = config.socket_addr()?;
    let monitoring = config.load_monitoring()?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        interval_secs = monitoring.collection_interval_secs,
        buffer_size = monitoring.buffer_size,
        servers = monitoring.servers.len(),
        "Lookout server starting"
    );

    let state = AppState::from_config(monitoring);
    let listener = TcpListener::bind(addr).await?;

    let mut scheduler = CollectionScheduler::for_context(state.context(), state.http().clone());
    scheduler.start();

    tracing::info!(%addr, "Listening for connections");

    let served = axum::serve(listener, create_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    scheduler.stop().await;
    state.context().shutdown();

    served?;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Creates the main application router with all routes and middleware.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    let routes = Router::new()
        .merge(routes::health_routes(state.clone()))
        .merge(routes::metrics_routes(state.clone()))
        .merge(routes::status_routes(state.clone()))
        .merge(routes::dashboard_routes(state.clone()));

    with_middleware(routes, &state)
}

/// Wraps a router in the panic, instrumentation and trace layers.
///
/// Panics are converted to responses before the instrumentation sees them,
/// so a panicking handler is still timed and counted.
pub fn with_middleware(router: Router, state: &AppState) -> Router {
    router
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(axum::middleware::from_fn_with_state(
            state.instrumentation().clone(),
            middleware::instrument_requests,
        ))
        .layer(TraceLayer::new_for_http())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
