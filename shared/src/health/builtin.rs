//! Health checks registered by default.

use super::HealthCheck;
use crate::models::CheckReport;
use crate::storage::TimeSeriesStore;
use crate::system::SystemSampler;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Resource ceilings above which the host is reported unhealthy.
const CPU_LIMIT: f64 = 90.0;
const MEMORY_LIMIT: f64 = 90.0;
const DISK_LIMIT: f64 = 95.0;

/// Reports unhealthy when CPU, memory or disk usage is near exhaustion.
#[derive(Debug, Default)]
pub struct SystemResourcesCheck {
    sampler: Mutex<SystemSampler>,
}

impl SystemResourcesCheck {
    /// Creates the check with its own sampler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl HealthCheck for SystemResourcesCheck {
    fn check(&self) -> anyhow::Result<CheckReport> {
        let sample = self
            .sampler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sample();

        let cpu_ok = sample.cpu_percent < CPU_LIMIT;
        let memory_ok = sample.memory_percent < MEMORY_LIMIT;
        let disk_ok = sample.disk_percent < DISK_LIMIT;

        Ok(CheckReport::from_bool(cpu_ok && memory_ok && disk_ok)
            .with_detail("cpu_percent", sample.cpu_percent)
            .with_detail("memory_percent", sample.memory_percent)
            .with_detail("disk_percent", sample.disk_percent)
            .with_detail(
                "thresholds_ok",
                json!({ "cpu": cpu_ok, "memory": memory_ok, "disk": disk_ok }),
            ))
    }
}

/// Reports whether every required executable can be found on `PATH`.
#[derive(Debug, Clone)]
pub struct ToolsAvailabilityCheck {
    tools: Vec<String>,
}

impl ToolsAvailabilityCheck {
    /// Creates the check for a list of executable names.
    #[must_use]
    pub fn new(tools: Vec<String>) -> Self {
        Self { tools }
    }
}

impl HealthCheck for ToolsAvailabilityCheck {
    fn check(&self) -> anyhow::Result<CheckReport> {
        let search_path = std::env::var_os("PATH").unwrap_or_default();
        let dirs: Vec<_> = std::env::split_paths(&search_path).collect();

        let status: BTreeMap<String, bool> = self
            .tools
            .iter()
            .map(|tool| (tool.clone(), dirs.iter().any(|dir| is_executable(&dir.join(tool)))))
            .collect();

        let available = status.values().filter(|ok| **ok).count();

        Ok(CheckReport::from_bool(available == status.len())
            .with_detail("tools_status", serde_json::to_value(&status)?)
            .with_detail("available_count", available)
            .with_detail("total_count", status.len()))
    }
}

/// Reports on the observation store itself.
#[derive(Debug, Clone)]
pub struct StoreCheck {
    store: Arc<TimeSeriesStore>,
}

impl StoreCheck {
    /// Creates the check for a store.
    #[must_use]
    pub fn new(store: Arc<TimeSeriesStore>) -> Self {
        Self { store }
    }
}

impl HealthCheck for StoreCheck {
    fn check(&self) -> anyhow::Result<CheckReport> {
        Ok(CheckReport::from_bool(!self.store.is_closed())
            .with_detail("retained", self.store.len())
            .with_detail("capacity", self.store.capacity()))
    }
}

fn is_executable(path: &Path) -> bool {
    if path.is_file() {
        return true;
    }
    cfg!(windows) && path.with_extension("exe").is_file()
}
