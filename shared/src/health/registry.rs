//! Named health-check registry.
//!
//! Checks are synchronous functions returning a [`CheckReport`]. Running the
//! registry invokes every check in isolation: a check that errors or panics
//! is reported unhealthy without affecting the others.

use crate::models::{CheckReport, CheckResult, HealthReport};
use crate::storage::TimeSeriesStore;
use chrono::Utc;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// A named probe of some subsystem's well-being.
///
/// Implemented for any `Fn() -> anyhow::Result<CheckReport>`, so plain
/// closures can be registered directly.
pub trait HealthCheck: Send + Sync {
    /// Runs the check.
    ///
    /// # Errors
    ///
    /// Returns an error if the check could not determine a result; the
    /// registry records such a check as unhealthy.
    fn check(&self) -> anyhow::Result<CheckReport>;
}

impl<F> HealthCheck for F
where
    F: Fn() -> anyhow::Result<CheckReport> + Send + Sync,
{
    fn check(&self) -> anyhow::Result<CheckReport> {
        self()
    }
}

/// Fields the registry sets on every result; a check cannot override them.
const RESERVED_FIELDS: [&str; 4] = ["healthy", "error", "check_duration", "timestamp"];

/// Why a check produced no report.
#[derive(Debug)]
enum CheckFailure {
    Error(String),
    Panic(String),
}

impl CheckFailure {
    fn kind(&self) -> &'static str {
        match self {
            Self::Error(_) => "error",
            Self::Panic(_) => "panic",
        }
    }

    fn message(self) -> String {
        match self {
            Self::Error(m) | Self::Panic(m) => m,
        }
    }
}

/// Registry of named health checks.
///
/// Every invocation records `health_check.<name>.duration` and
/// `health_check.<name>.status` into the store, plus
/// `health_check.<name>.errors` when the check fails.
pub struct HealthCheckRegistry {
    checks: RwLock<BTreeMap<String, Arc<dyn HealthCheck>>>,
    store: Arc<TimeSeriesStore>,
}

impl HealthCheckRegistry {
    /// Creates an empty registry that reports into `store`.
    #[must_use]
    pub fn new(store: Arc<TimeSeriesStore>) -> Self {
        Self {
            checks: RwLock::new(BTreeMap::new()),
            store,
        }
    }

    /// Registers a check function, replacing any previous check with the same name.
    pub fn register<F>(&self, name: impl Into<String>, check: F)
    where
        F: Fn() -> anyhow::Result<CheckReport> + Send + Sync + 'static,
    {
        self.register_check(name, check);
    }

    /// Registers a [`HealthCheck`] implementation, replacing any previous
    /// check with the same name.
    pub fn register_check(&self, name: impl Into<String>, check: impl HealthCheck + 'static) {
        let name = name.into();
        let replaced = self
            .checks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), Arc::new(check))
            .is_some();

        if replaced {
            tracing::info!(check = %name, "Replaced health check");
        } else {
            tracing::info!(check = %name, "Registered health check");
        }
    }

    /// Names of all registered checks, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.checks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Number of registered checks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.checks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no check is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every registered check in turn and aggregates the results.
    ///
    /// `overall_healthy` is the logical AND of every check's result; an empty
    /// registry is healthy.
    pub fn run_all(&self) -> HealthReport {
        // Run outside the lock so a slow check never blocks registration.
        let checks: Vec<(String, Arc<dyn HealthCheck>)> = self
            .checks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, check)| (name.clone(), Arc::clone(check)))
            .collect();

        let mut results = BTreeMap::new();
        for (name, check) in checks {
            let result = self.run_one(&name, check.as_ref());
            results.insert(name, result);
        }

        HealthReport {
            overall_healthy: results.values().all(|r| r.healthy),
            checks: results,
            timestamp: Utc::now(),
        }
    }

    fn run_one(&self, name: &str, check: &dyn HealthCheck) -> CheckResult {
        let started = Instant::now();
        let outcome = match catch_unwind(AssertUnwindSafe(|| check.check())) {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(e)) => Err(CheckFailure::Error(format!("{e:#}"))),
            Err(payload) => Err(CheckFailure::Panic(panic_message(payload.as_ref()))),
        };
        let duration = started.elapsed().as_secs_f64();

        let result = match outcome {
            Ok(CheckReport {
                healthy,
                mut details,
            }) => {
                for field in RESERVED_FIELDS {
                    details.remove(field);
                }
                CheckResult {
                    healthy,
                    details,
                    error: None,
                    check_duration: duration,
                    timestamp: Utc::now(),
                }
            }
            Err(failure) => {
                let kind = failure.kind();
                let message = failure.message();
                tracing::error!(check = %name, error_type = kind, error = %message, "Health check failed");
                self.store.record(
                    format!("health_check.{name}.errors"),
                    1.0,
                    [("check", name), ("error_type", kind)],
                );
                CheckResult {
                    healthy: false,
                    details: serde_json::Map::new(),
                    error: Some(message),
                    check_duration: duration,
                    timestamp: Utc::now(),
                }
            }
        };

        self.store.record(
            format!("health_check.{name}.duration"),
            duration,
            [("check", name)],
        );
        self.store.record(
            format!("health_check.{name}.status"),
            if result.healthy { 1.0 } else { 0.0 },
            [("check", name)],
        );

        result
    }
}

impl std::fmt::Debug for HealthCheckRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthCheckRegistry")
            .field("checks", &self.names())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "health check panicked".to_string()
    }
}
