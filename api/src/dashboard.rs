//! Dashboard views.
//!
//! Read-only summaries over the store and health table. Nothing here writes
//! observations; the only side effect is the best-effort `/status` calls made
//! by [`DashboardAggregator::servers`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::models::{Observation, ServerHealthRecord};
use shared::storage::SeriesQuery;
use shared::MonitoringContext;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use tokio::task::JoinSet;

const OVERVIEW_WINDOW: Duration = Duration::from_secs(5 * 60);
const ALERT_WINDOW: Duration = Duration::from_secs(10 * 60);
const ERROR_RATE_LIMIT: f64 = 0.05;
const RESOURCE_LIMIT: f64 = 90.0;

/// Coarse health of a group of servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    /// Every server is healthy (or there are none).
    Healthy,
    /// Some servers are healthy.
    Degraded,
    /// No server is healthy.
    Unhealthy,
}

impl HealthLevel {
    /// Classifies `healthy` out of `total` servers.
    #[must_use]
    pub fn from_counts(healthy: usize, total: usize) -> Self {
        if healthy >= total {
            Self::Healthy
        } else if healthy == 0 {
            Self::Unhealthy
        } else {
            Self::Degraded
        }
    }
}

/// Headline numbers over the last five minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Overview {
    /// Completed requests.
    pub total_requests: usize,
    /// Mean request duration in seconds.
    pub avg_response_time: f64,
    /// Faulted requests divided by completed requests.
    pub error_rate: f64,
    /// Health of the configured sibling servers.
    pub system_health: HealthLevel,
    /// Servers whose last probe was healthy.
    pub active_servers: usize,
    /// Enabled servers in the configuration.
    pub total_servers: usize,
    /// When the overview was computed.
    pub last_updated: DateTime<Utc>,
}

/// The health table with an overall classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthView {
    /// Overall status of the probed servers.
    pub overall_status: HealthLevel,
    /// Latest probe record per server.
    pub servers: BTreeMap<String, ServerHealthRecord>,
    /// When the view was computed.
    pub last_updated: DateTime<Utc>,
}

/// Severity of a dashboard alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Worth a look.
    Warning,
    /// Needs attention now.
    Critical,
}

/// One derived alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardAlert {
    /// Severity.
    pub severity: AlertSeverity,
    /// Human-readable description.
    pub message: String,
    /// Offending value.
    pub value: f64,
    /// When the offending value was observed.
    pub timestamp: DateTime<Utc>,
}

/// Alerts derived from the last ten minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsView {
    /// Active alerts.
    pub alerts: Vec<DashboardAlert>,
    /// Number of alerts.
    pub count: usize,
}

/// Look-back window of the metrics view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeRange {
    /// Five minutes.
    #[serde(rename = "5m")]
    FiveMinutes,
    /// Fifteen minutes.
    #[serde(rename = "15m")]
    FifteenMinutes,
    /// One hour.
    #[default]
    #[serde(rename = "1h")]
    OneHour,
    /// Six hours.
    #[serde(rename = "6h")]
    SixHours,
    /// One day.
    #[serde(rename = "24h")]
    OneDay,
}

impl TimeRange {
    /// Length of the window.
    #[must_use]
    pub fn duration(self) -> Duration {
        let minutes = match self {
            Self::FiveMinutes => 5,
            Self::FifteenMinutes => 15,
            Self::OneHour => 60,
            Self::SixHours => 6 * 60,
            Self::OneDay => 24 * 60,
        };
        Duration::from_secs(minutes * 60)
    }

    /// Parses a range, falling back to one hour for anything unrecognised.
    #[must_use]
    pub fn parse_or_default(s: Option<&str>) -> Self {
        s.and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "5m" => Ok(Self::FiveMinutes),
            "15m" => Ok(Self::FifteenMinutes),
            "1h" => Ok(Self::OneHour),
            "6h" => Ok(Self::SixHours),
            "24h" => Ok(Self::OneDay),
            other => Err(format!("unknown time range: {other}")),
        }
    }
}

/// Observations grouped by area.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupedMetrics {
    /// Host resource observations.
    pub system: Vec<Observation>,
    /// Request timing observations.
    pub http: Vec<Observation>,
    /// Tool execution observations.
    pub tools: Vec<Observation>,
    /// Other error counters.
    pub errors: Vec<Observation>,
}

/// Observations inside a time range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsView {
    /// The requested range.
    pub time_range: TimeRange,
    /// Grouped observations.
    pub metrics: GroupedMetrics,
    /// All observations in the range, grouped or not.
    pub total_count: usize,
}

/// Computes dashboard views from a monitoring context.
#[derive(Debug, Clone)]
pub struct DashboardAggregator {
    context: MonitoringContext,
    client: reqwest::Client,
}

impl DashboardAggregator {
    /// Creates an aggregator calling sibling servers with `client`.
    #[must_use]
    pub fn new(context: MonitoringContext, client: reqwest::Client) -> Self {
        Self { context, client }
    }

    /// Request, latency and server counts over the last five minutes.
    #[must_use]
    pub fn overview(&self) -> Overview {
        let recent = self.recent(OVERVIEW_WINDOW);
        let traffic = Traffic::from_observations(&recent);

        let active_servers = self.context.health().healthy_count();
        let total_servers = self.context.config().enabled_servers().count();

        Overview {
            total_requests: traffic.requests,
            avg_response_time: traffic.avg_duration,
            error_rate: traffic.error_rate(),
            system_health: HealthLevel::from_counts(active_servers, total_servers),
            active_servers,
            total_servers,
            last_updated: Utc::now(),
        }
    }

    /// The health table with an overall status.
    #[must_use]
    pub fn health(&self) -> HealthView {
        let servers = self.context.health().snapshot();
        let healthy = servers.values().filter(|r| r.status.is_healthy()).count();

        HealthView {
            overall_status: HealthLevel::from_counts(healthy, servers.len()),
            servers,
            last_updated: Utc::now(),
        }
    }

    /// Best-effort `/status` of every enabled server.
    ///
    /// Calls run concurrently, each bounded by the status timeout. A failure
    /// is reported as `unreachable` in that server's entry.
    pub async fn servers(&self) -> BTreeMap<String, Value> {
        let timeout = self.context.config().status_timeout();
        let mut calls = JoinSet::new();
        let mut results = BTreeMap::new();

        for (name, server) in self.context.config().enabled_servers() {
            let Some(url) = server.url.clone() else {
                results.insert(name.to_string(), json!({"status": "local"}));
                continue;
            };
            let client = self.client.clone();
            let name = name.to_string();
            calls.spawn(async move {
                let status = fetch_status(&client, &url, timeout).await;
                (name, status)
            });
        }

        while let Some(joined) = calls.join_next().await {
            match joined {
                Ok((name, status)) => {
                    results.insert(name, status);
                }
                Err(e) => tracing::error!(error = %e, "Status call task failed"),
            }
        }

        results
    }

    /// Alerts derived from the last ten minutes of observations.
    #[must_use]
    pub fn alerts(&self) -> AlertsView {
        let recent = self.recent(ALERT_WINDOW);
        let mut alerts = Vec::new();

        let traffic = Traffic::from_observations(&recent);
        let error_rate = traffic.error_rate();
        if error_rate > ERROR_RATE_LIMIT {
            alerts.push(DashboardAlert {
                severity: AlertSeverity::Warning,
                message: format!("High error rate: {:.2}%", error_rate * 100.0),
                value: error_rate,
                timestamp: Utc::now(),
            });
        }

        for observation in &recent {
            let label = match observation.name.as_str() {
                "system.cpu.percent" => "CPU",
                "system.memory.percent" => "memory",
                _ => continue,
            };
            if observation.value > RESOURCE_LIMIT {
                alerts.push(DashboardAlert {
                    severity: AlertSeverity::Critical,
                    message: format!("High {label} usage: {:.1}%", observation.value),
                    value: observation.value,
                    timestamp: observation.timestamp,
                });
            }
        }

        AlertsView {
            count: alerts.len(),
            alerts,
        }
    }

    /// Observations inside `range`, grouped by area.
    #[must_use]
    pub fn metrics(&self, range: TimeRange) -> MetricsView {
        let observations = self.recent(range.duration());
        let total_count = observations.len();
        let mut grouped = GroupedMetrics::default();

        for observation in observations {
            let name = observation.name.as_str();
            if name.starts_with("system.") {
                grouped.system.push(observation);
            } else if name.starts_with("http.") || name.contains("response_time") {
                grouped.http.push(observation);
            } else if name.starts_with("tool.") {
                grouped.tools.push(observation);
            } else if name.contains("error") {
                grouped.errors.push(observation);
            }
        }

        MetricsView {
            time_range: range,
            metrics: grouped,
            total_count,
        }
    }

    fn recent(&self, window: Duration) -> Vec<Observation> {
        self.context
            .store()
            .query(&SeriesQuery::new().with_since(window))
    }
}

/// Request counters over a set of observations.
struct Traffic {
    requests: usize,
    errors: usize,
    avg_duration: f64,
}

impl Traffic {
    fn from_observations(observations: &[Observation]) -> Self {
        let requests = observations
            .iter()
            .filter(|o| o.name.starts_with("api.") && o.name.ends_with(".requests"))
            .count();
        let errors = observations
            .iter()
            .filter(|o| o.name == "http.errors.count")
            .count();

        let durations: Vec<f64> = observations
            .iter()
            .filter(|o| o.name == "http.request.duration")
            .map(|o| o.value)
            .collect();
        #[allow(clippy::cast_precision_loss)]
        let avg_duration = if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<f64>() / durations.len() as f64
        };

        Self {
            requests,
            errors,
            avg_duration,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn error_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.errors as f64 / self.requests as f64
        }
    }
}

async fn fetch_status(client: &reqwest::Client, url: &str, timeout: Duration) -> Value {
    let endpoint = format!("{}/status", url.trim_end_matches('/'));

    let response = match client.get(&endpoint).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => return json!({"status": "unreachable", "error": e.to_string()}),
    };

    if !response.status().is_success() {
        return json!({
            "status": "unreachable",
            "error": format!("HTTP {}", response.status().as_u16()),
        });
    }

    match response.json::<Value>().await {
        Ok(body) => body,
        Err(e) => json!({"status": "unreachable", "error": e.to_string()}),
    }
}
