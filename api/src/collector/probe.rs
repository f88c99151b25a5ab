//! Sibling server health probes.
//!
//! A probe never fails: transport errors and timeouts become an
//! `unreachable` record, bad responses an `unhealthy` one.

use serde_json::Value;
use shared::config::ServerConfig;
use shared::models::{ServerHealthRecord, ServerStatus};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Issues `GET <url>/health` against sibling servers.
#[derive(Debug, Clone)]
pub struct ServerProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl ServerProber {
    /// Creates a prober with a per-request timeout.
    #[must_use]
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// The per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probes one server and classifies the outcome.
    ///
    /// A server without a URL is a local process and is always healthy.
    pub async fn probe(&self, name: &str, server: &ServerConfig) -> ServerHealthRecord {
        let Some(url) = server.url.as_deref() else {
            return ServerHealthRecord::new(name, ServerStatus::Healthy, 0.0);
        };

        let endpoint = format!("{}/health", url.trim_end_matches('/'));
        let started = Instant::now();

        let response = match self
            .client
            .get(&endpoint)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let elapsed = started.elapsed().as_secs_f64();
                tracing::warn!(server = %name, %endpoint, error = %e, "Health probe failed");
                return ServerHealthRecord::new(name, ServerStatus::Unreachable, elapsed)
                    .with_error(describe(&e, self.timeout));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let elapsed = started.elapsed().as_secs_f64();
            return ServerHealthRecord::new(name, ServerStatus::Unhealthy, elapsed)
                .with_error(format!("HTTP {}", status.as_u16()));
        }

        let body = response.json::<Value>().await;
        let elapsed = started.elapsed().as_secs_f64();

        match body {
            Ok(body) => {
                let (healthy, tools) = classify_body(&body);
                let record = if healthy {
                    ServerHealthRecord::new(name, ServerStatus::Healthy, elapsed)
                } else {
                    ServerHealthRecord::new(name, ServerStatus::Unhealthy, elapsed)
                        .with_error("Server reported unhealthy")
                };
                record.with_tools(tools)
            }
            Err(e) if e.is_timeout() => {
                ServerHealthRecord::new(name, ServerStatus::Unreachable, elapsed)
                    .with_error(describe(&e, self.timeout))
            }
            Err(e) => ServerHealthRecord::new(name, ServerStatus::Unhealthy, elapsed)
                .with_error(format!("Invalid health response: {e}")),
        }
    }
}

/// Judges a `/health` body.
///
/// Healthy when `status` is `healthy` or `ok`, or when `healthy` or
/// `overall_healthy` is `true`. A `tools_status` object of booleans is
/// returned alongside.
#[must_use]
pub fn classify_body(body: &Value) -> (bool, BTreeMap<String, bool>) {
    let by_status = body
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|s| s.eq_ignore_ascii_case("healthy") || s.eq_ignore_ascii_case("ok"));
    let by_flag = ["healthy", "overall_healthy"]
        .iter()
        .any(|key| body.get(key).and_then(Value::as_bool) == Some(true));

    let tools = body
        .get("tools_status")
        .and_then(Value::as_object)
        .map(|tools| {
            tools
                .iter()
                .filter_map(|(tool, ok)| ok.as_bool().map(|ok| (tool.clone(), ok)))
                .collect()
        })
        .unwrap_or_default();

    (by_status || by_flag, tools)
}

fn describe(err: &reqwest::Error, timeout: Duration) -> String {
    if err.is_timeout() {
        format!("Timed out after {:.1}s: {err}", timeout.as_secs_f64())
    } else if err.is_connect() {
        format!("Connection failed: {err}")
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_status_field() {
        assert!(classify_body(&json!({"status": "healthy"})).0);
        assert!(classify_body(&json!({"status": "OK"})).0);
        assert!(!classify_body(&json!({"status": "degraded"})).0);
    }

    #[test]
    fn test_classify_boolean_fields() {
        assert!(classify_body(&json!({"overall_healthy": true})).0);
        assert!(classify_body(&json!({"healthy": true})).0);
        assert!(!classify_body(&json!({"healthy": false})).0);
        assert!(!classify_body(&json!({})).0);
        assert!(!classify_body(&json!([1, 2])).0);
    }

    #[test]
    fn test_classify_tools_status() {
        let (_, tools) = classify_body(&json!({
            "status": "healthy",
            "tools_status": {"nmap": true, "nikto": false, "odd": "yes"}
        }));

        assert_eq!(tools.len(), 2);
        assert!(tools["nmap"]);
        assert!(!tools["nikto"]);
    }

    #[tokio::test]
    async fn test_local_server_is_healthy() {
        let prober = ServerProber::new(reqwest::Client::new(), Duration::from_secs(1));

        let record = prober.probe("mcp", &ServerConfig::local()).await;

        assert_eq!(record.status, ServerStatus::Healthy);
        assert!(record.response_time.abs() < f64::EPSILON);
        assert!(record.error_message.is_none());
    }
}
