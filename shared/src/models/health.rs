//! Health data models.
//!
//! Defines the per-server probe record kept in the health table and the
//! results produced by registered health checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Reachability state of a sibling server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// The server answered its health endpoint and reported itself healthy.
    Healthy,
    /// The server answered but reported a problem, or answered with a non-200 status.
    Unhealthy,
    /// The server could not be reached within the probe timeout.
    Unreachable,
}

impl ServerStatus {
    /// Returns `true` for [`ServerStatus::Healthy`].
    #[must_use]
    pub fn is_healthy(self) -> bool {
        self == Self::Healthy
    }

    /// Value recorded in the `server.<name>.health` observation.
    #[must_use]
    pub fn as_gauge(self) -> f64 {
        if self.is_healthy() {
            1.0
        } else {
            0.0
        }
    }
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Latest probe outcome for one sibling server.
///
/// One record exists per server name and it is replaced wholesale on every
/// probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerHealthRecord {
    /// Configured server name.
    pub server_name: String,
    /// Classified probe outcome.
    pub status: ServerStatus,
    /// When the probe completed.
    pub last_check: DateTime<Utc>,
    /// Probe round-trip time in seconds.
    pub response_time: f64,
    /// Error text for unhealthy or unreachable outcomes.
    pub error_message: Option<String>,
    /// Tool availability reported by the server, if any.
    #[serde(default)]
    pub tool_availability: BTreeMap<String, bool>,
}

impl ServerHealthRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(server_name: impl Into<String>, status: ServerStatus, response_time: f64) -> Self {
        Self {
            server_name: server_name.into(),
            status,
            last_check: Utc::now(),
            response_time,
            error_message: None,
            tool_availability: BTreeMap::new(),
        }
    }

    /// Sets the error message.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Sets the reported tool availability.
    #[must_use]
    pub fn with_tools(mut self, tools: BTreeMap<String, bool>) -> Self {
        self.tool_availability = tools;
        self
    }
}

/// What a registered health check function reports.
///
/// # Example
///
/// ```
/// use shared::models::CheckReport;
///
/// let report = CheckReport::healthy().with_detail("open_connections", 3);
/// assert!(report.healthy);
/// assert_eq!(report.details["open_connections"], 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    /// Whether the checked subsystem is healthy.
    pub healthy: bool,
    /// Arbitrary check-specific fields.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl CheckReport {
    /// Creates a healthy report with no details.
    #[must_use]
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            details: Map::new(),
        }
    }

    /// Creates an unhealthy report with no details.
    #[must_use]
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            details: Map::new(),
        }
    }

    /// Creates a report from a boolean.
    #[must_use]
    pub fn from_bool(healthy: bool) -> Self {
        Self {
            healthy,
            details: Map::new(),
        }
    }

    /// Adds a detail field.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Result of one check invocation, as returned by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Whether the check passed.
    pub healthy: bool,
    /// Fields reported by the check.
    #[serde(flatten)]
    pub details: Map<String, Value>,
    /// Failure message when the check itself failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall time spent in the check, in seconds.
    pub check_duration: f64,
    /// When the check finished.
    pub timestamp: DateTime<Utc>,
}

/// Aggregated outcome of running every registered check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Logical AND of every check's `healthy` field.
    pub overall_healthy: bool,
    /// Per-check results keyed by registration name.
    pub checks: BTreeMap<String, CheckResult>,
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
}
