//! Exporters for the observation store.
//!
//! Renders store snapshots as a JSON document (full series, health table and
//! summary statistics) or as Prometheus text (latest value per name).
//!
//! # Example
//!
//! ```
//! use shared::export::{ExportFormat, Exporter};
//! use shared::storage::{HealthStatusTable, TimeSeriesStore};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let store = Arc::new(TimeSeriesStore::new(100, Duration::from_secs(3600)));
//! store.record("system.cpu.percent", 12.5, [("source", "system")]);
//!
//! let exporter = Exporter::new(store, Arc::new(HealthStatusTable::new()), "notyyet");
//! let text = exporter.export(ExportFormat::Prometheus).unwrap();
//!
//! assert!(text.contains("notyyet_system_cpu_percent{source=\"system\"} 12.5"));
//! ```

pub mod prometheus;
pub mod summary;

pub use summary::{summarize, MetricSummary};

use crate::models::{Observation, ServerHealthRecord};
use crate::storage::{HealthStatusTable, SeriesQuery, TimeSeriesStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default window for summary statistics.
pub const DEFAULT_SUMMARY_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Errors that can occur while exporting.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The requested format is not supported.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Serialization of the JSON document failed.
    #[error("Failed to serialize export: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Full JSON document.
    Json,
    /// Prometheus text exposition.
    #[default]
    Prometheus,
}

impl ExportFormat {
    /// HTTP content type of the rendered document.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Prometheus => "text/plain; charset=utf-8",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "prometheus" => Ok(Self::Prometheus),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Prometheus => write!(f, "prometheus"),
        }
    }
}

/// The JSON export document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    /// Every retained observation, in insertion order.
    pub metrics: Vec<Observation>,
    /// Latest probe record per server.
    pub health: BTreeMap<String, ServerHealthRecord>,
    /// Per-name statistics over the summary window.
    pub summary: BTreeMap<String, MetricSummary>,
    /// When the document was produced.
    pub exported_at: DateTime<Utc>,
}

/// Read-only renderer over the store and health table.
#[derive(Debug, Clone)]
pub struct Exporter {
    store: Arc<TimeSeriesStore>,
    health: Arc<HealthStatusTable>,
    prefix: String,
    summary_window: Duration,
}

impl Exporter {
    /// Creates an exporter with the default summary window.
    #[must_use]
    pub fn new(
        store: Arc<TimeSeriesStore>,
        health: Arc<HealthStatusTable>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            health,
            prefix: prefix.into(),
            summary_window: DEFAULT_SUMMARY_WINDOW,
        }
    }

    /// Sets the window used for summary statistics.
    #[must_use]
    pub fn with_summary_window(mut self, window: Duration) -> Self {
        self.summary_window = window;
        self
    }

    /// Renders the store in the given format.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON document cannot be serialized.
    pub fn export(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(&self.document())?),
            ExportFormat::Prometheus => Ok(self.prometheus()),
        }
    }

    /// Renders the store in a format named by a string.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::UnsupportedFormat`] for anything other than
    /// `json` or `prometheus`.
    pub fn export_named(&self, format: &str) -> Result<String, ExportError> {
        self.export(format.parse()?)
    }

    /// Builds the JSON export document.
    #[must_use]
    pub fn document(&self) -> ExportDocument {
        ExportDocument {
            metrics: self.store.snapshot(),
            health: self.health.snapshot(),
            summary: self.summary(),
            exported_at: Utc::now(),
        }
    }

    /// Renders the Prometheus text document.
    #[must_use]
    pub fn prometheus(&self) -> String {
        let latest = self.store.latest_by_name();
        prometheus::render(&self.prefix, latest.values())
    }

    /// Per-name statistics over observations inside the summary window.
    #[must_use]
    pub fn summary(&self) -> BTreeMap<String, MetricSummary> {
        let recent = self
            .store
            .query(&SeriesQuery::new().with_since(self.summary_window));
        summarize(&recent)
    }
}
