//! Monitoring configuration.
//!
//! Every field has a default; a JSON file may override any subset of
//! top-level fields. Configuration is read once at startup.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// Path of the file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid JSON for this schema.
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        /// Path of the file.
        path: String,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<validator::ValidationErrors> for ConfigError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Invalid(errors.to_string())
    }
}

/// A sibling server probed by the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL; `None` for a local process without an HTTP surface.
    #[serde(default)]
    pub url: Option<String>,

    /// Whether the server is probed at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ServerConfig {
    /// Creates an enabled server entry with a URL.
    #[must_use]
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            enabled: true,
        }
    }

    /// Creates an enabled server entry without an HTTP surface.
    #[must_use]
    pub fn local() -> Self {
        Self {
            url: None,
            enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Configuration of the monitoring subsystem.
///
/// # Example
///
/// ```
/// use shared::config::MonitoringConfig;
///
/// let config: MonitoringConfig =
///     serde_json::from_str(r#"{"collection_interval_secs": 10}"#).unwrap();
///
/// assert_eq!(config.collection_interval_secs, 10);
/// assert_eq!(config.buffer_size, 10_000);
/// assert!(config.validate_config().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Seconds between collection ticks.
    #[validate(range(min = 1, message = "collection interval must be at least one second"))]
    pub collection_interval_secs: u64,

    /// Maximum number of retained observations.
    #[validate(range(min = 1, message = "buffer size must be at least one"))]
    pub buffer_size: usize,

    /// Maximum age of retained observations, in hours.
    #[validate(range(min = 1, message = "retention must be at least one hour"))]
    pub metrics_retention_hours: u64,

    /// Alert thresholds keyed by metric name suffix.
    ///
    /// The suffix is the last dot-segment of an observation name. Host
    /// samples such as `system.cpu.percent` all end in `percent`, so the
    /// default `cpu_percent`, `memory_percent` and `disk_percent` keys only
    /// match observations named like `host.cpu_percent`. Use a `percent` key
    /// to alert on every sampled host percentage.
    pub alert_thresholds: HashMap<String, f64>,

    /// Sibling servers keyed by name.
    pub servers: BTreeMap<String, ServerConfig>,

    /// Timeout for each `/health` probe, in seconds.
    #[validate(range(min = 1))]
    pub probe_timeout_secs: u64,

    /// Timeout for each dashboard `/status` call, in seconds.
    #[validate(range(min = 1))]
    pub status_timeout_secs: u64,

    /// Pause after a failed collection tick, in seconds.
    pub error_backoff_secs: u64,

    /// Bounded wait when stopping the collector, in seconds.
    #[validate(range(min = 1))]
    pub shutdown_timeout_secs: u64,

    /// Window for summary statistics, in seconds.
    #[validate(range(min = 1))]
    pub summary_window_secs: u64,

    /// Prefix of every Prometheus metric name.
    #[validate(length(min = 1, message = "prometheus prefix cannot be empty"))]
    pub prometheus_prefix: String,

    /// Executables that must be on `PATH` for the host to be healthy.
    pub required_tools: Vec<String>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            collection_interval_secs: 30,
            buffer_size: 10_000,
            metrics_retention_hours: 24,
            alert_thresholds: HashMap::from([
                ("cpu_percent".to_string(), 80.0),
                ("memory_percent".to_string(), 85.0),
                ("disk_percent".to_string(), 90.0),
                ("response_time".to_string(), 5.0),
                ("error_rate".to_string(), 0.05),
            ]),
            servers: BTreeMap::from([
                ("kali".to_string(), ServerConfig::http("http://localhost:5000")),
                (
                    "perplexity".to_string(),
                    ServerConfig::http("http://localhost:5050"),
                ),
                ("mcp".to_string(), ServerConfig::local()),
            ]),
            probe_timeout_secs: 10,
            status_timeout_secs: 5,
            error_backoff_secs: 5,
            shutdown_timeout_secs: 5,
            summary_window_secs: 300,
            prometheus_prefix: "notyyet".to_string(),
            required_tools: Vec::new(),
        }
    }
}

impl MonitoringConfig {
    /// Loads configuration from an optional JSON file merged over defaults.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        if !path.exists() {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        config.validate_config()?;
        tracing::info!(path = %path.display(), "Loaded monitoring config");
        Ok(config)
    }

    /// Validates ranges and server URLs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate_config(&self) -> Result<(), ConfigError> {
        self.validate()?;

        for (name, server) in &self.servers {
            if name.is_empty() {
                return Err(ConfigError::Invalid("server name cannot be empty".to_string()));
            }
            if let Some(ref url) = server.url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::Invalid(format!(
                        "server '{name}' url must start with http:// or https://"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Enabled servers, sorted by name.
    pub fn enabled_servers(&self) -> impl Iterator<Item = (&str, &ServerConfig)> {
        self.servers
            .iter()
            .filter(|(_, s)| s.enabled)
            .map(|(name, s)| (name.as_str(), s))
    }

    /// Time between collection ticks.
    #[must_use]
    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_secs)
    }

    /// Retention period of the store.
    #[must_use]
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.metrics_retention_hours.saturating_mul(60 * 60))
    }

    /// Timeout for one health probe.
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Timeout for one dashboard status call.
    #[must_use]
    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }

    /// Pause after a failed tick.
    #[must_use]
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    /// Bounded wait when stopping the collector.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Window for summary statistics.
    #[must_use]
    pub fn summary_window(&self) -> Duration {
        Duration::from_secs(self.summary_window_secs)
    }
}
