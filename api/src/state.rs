//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use shared::config::MonitoringConfig;
use shared::export::Exporter;
use shared::storage::{HealthStatusTable, TimeSeriesStore};
use shared::health::HealthCheckRegistry;
use shared::MonitoringContext;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::dashboard::DashboardAggregator;
use crate::middleware::RequestInstrumentation;

/// Application state shared across all request handlers.
///
/// Cloning is cheap; every clone shares the same store, health table and
/// registry.
#[derive(Debug, Clone)]
pub struct AppState {
    context: MonitoringContext,
    exporter: Exporter,
    instrumentation: RequestInstrumentation,
    dashboard: DashboardAggregator,
    http: reqwest::Client,
    started_at: Instant,
}

impl AppState {
    /// Creates the application state around an existing monitoring context.
    #[must_use]
    pub fn new(context: MonitoringContext) -> Self {
        let http = reqwest::Client::new();
        Self {
            exporter: context.exporter(),
            instrumentation: RequestInstrumentation::new(Arc::clone(context.store())),
            dashboard: DashboardAggregator::new(context.clone(), http.clone()),
            http,
            context,
            started_at: Instant::now(),
        }
    }

    /// Creates the state for a configuration, with the built-in health checks
    /// registered.
    #[must_use]
    pub fn from_config(config: MonitoringConfig) -> Self {
        Self::new(MonitoringContext::with_builtin_checks(config))
    }

    /// Creates a state with default configuration and no registered checks.
    ///
    /// This is useful for development and testing.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(MonitoringContext::default())
    }

    /// Returns the monitoring context.
    #[must_use]
    pub fn context(&self) -> &MonitoringContext {
        &self.context
    }

    /// Returns the monitoring configuration.
    #[must_use]
    pub fn config(&self) -> &MonitoringConfig {
        self.context.config()
    }

    /// Returns the observation store.
    #[must_use]
    pub fn store(&self) -> &Arc<TimeSeriesStore> {
        self.context.store()
    }

    /// Returns the server health table.
    #[must_use]
    pub fn health(&self) -> &Arc<HealthStatusTable> {
        self.context.health()
    }

    /// Returns the health-check registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<HealthCheckRegistry> {
        self.context.registry()
    }

    /// Returns the exporter.
    #[must_use]
    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    /// Returns the request instrumentation hooks.
    #[must_use]
    pub fn instrumentation(&self) -> &RequestInstrumentation {
        &self.instrumentation
    }

    /// Returns the dashboard aggregator.
    #[must_use]
    pub fn dashboard(&self) -> &DashboardAggregator {
        &self.dashboard
    }

    /// Returns the outbound HTTP client.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Time since the state was created.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_defaults()
    }
}
