//! The monitoring context.
//!
//! Owns the process-wide store, health table and check registry. It is built
//! once at startup and handed by reference to every component that reads or
//! writes observations.

use crate::alert::AlertEvaluator;
use crate::config::MonitoringConfig;
use crate::export::Exporter;
use crate::health::{HealthCheckRegistry, StoreCheck, SystemResourcesCheck, ToolsAvailabilityCheck};
use crate::instrument::OperationRecorder;
use crate::storage::{HealthStatusTable, TimeSeriesStore};
use std::sync::Arc;

/// Shared handles to the monitoring state.
#[derive(Debug, Clone)]
pub struct MonitoringContext {
    config: Arc<MonitoringConfig>,
    store: Arc<TimeSeriesStore>,
    health: Arc<HealthStatusTable>,
    registry: Arc<HealthCheckRegistry>,
}

impl MonitoringContext {
    /// Builds an empty context from configuration, without built-in checks.
    #[must_use]
    pub fn new(config: MonitoringConfig) -> Self {
        let alerts = AlertEvaluator::new(config.alert_thresholds.clone());
        let store = Arc::new(TimeSeriesStore::with_alerts(
            config.buffer_size,
            config.retention(),
            alerts,
        ));
        let registry = Arc::new(HealthCheckRegistry::new(Arc::clone(&store)));

        Self {
            config: Arc::new(config),
            store,
            health: Arc::new(HealthStatusTable::new()),
            registry,
        }
    }

    /// Builds a context and registers the built-in health checks.
    #[must_use]
    pub fn with_builtin_checks(config: MonitoringConfig) -> Self {
        let context = Self::new(config);
        context
            .registry
            .register_check("system_resources", SystemResourcesCheck::new());
        context
            .registry
            .register_check("metrics_store", StoreCheck::new(Arc::clone(&context.store)));
        if !context.config.required_tools.is_empty() {
            context.registry.register_check(
                "tools_availability",
                ToolsAvailabilityCheck::new(context.config.required_tools.clone()),
            );
        }
        context
    }

    /// The configuration the context was built from.
    #[must_use]
    pub fn config(&self) -> &MonitoringConfig {
        &self.config
    }

    /// The observation store.
    #[must_use]
    pub fn store(&self) -> &Arc<TimeSeriesStore> {
        &self.store
    }

    /// The per-server health table.
    #[must_use]
    pub fn health(&self) -> &Arc<HealthStatusTable> {
        &self.health
    }

    /// The health-check registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<HealthCheckRegistry> {
        &self.registry
    }

    /// An exporter over the store and health table.
    #[must_use]
    pub fn exporter(&self) -> Exporter {
        Exporter::new(
            Arc::clone(&self.store),
            Arc::clone(&self.health),
            self.config.prometheus_prefix.clone(),
        )
        .with_summary_window(self.config.summary_window())
    }

    /// A recorder for ad hoc operation instrumentation.
    #[must_use]
    pub fn recorder(&self) -> OperationRecorder {
        OperationRecorder::new(Arc::clone(&self.store))
    }

    /// Marks the store as shut down.
    pub fn shutdown(&self) {
        self.store.close();
    }
}

impl Default for MonitoringContext {
    fn default() -> Self {
        Self::new(MonitoringConfig::default())
    }
}
