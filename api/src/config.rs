//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use shared::config::MonitoringConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Output format of the process log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            Ok(Self::Text)
        }
    }
}

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `LOOKOUT_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `LOOKOUT_PORT`: The port to listen on (default: 8080)
/// - `LOOKOUT_CONFIG`: Path to a JSON monitoring config file (optional)
/// - `LOOKOUT_LOG_FORMAT`: `text` or `json` (default: text)
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Monitoring config file, if any.
    pub monitoring_config: Option<PathBuf>,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `LOOKOUT_PORT` is set but cannot be parsed as a valid port number
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("LOOKOUT_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("LOOKOUT_PORT")
            .ok()
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("LOOKOUT_PORT is not a valid port")?
            .unwrap_or(8080);

        let monitoring_config = std::env::var_os("LOOKOUT_CONFIG").map(PathBuf::from);

        let log_format = std::env::var("LOOKOUT_LOG_FORMAT")
            .ok()
            .and_then(|f| f.parse().ok())
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            monitoring_config,
            log_format,
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port do not form a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }

    /// Loads the monitoring configuration named by `LOOKOUT_CONFIG`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated.
    pub fn load_monitoring(&self) -> Result<MonitoringConfig> {
        Ok(MonitoringConfig::load(self.monitoring_config.as_deref())?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            monitoring_config: None,
            log_format: LogFormat::Text,
        }
    }
}
