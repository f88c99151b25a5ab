//! Configuration module.
//!
//! This module contains configuration structures for the monitoring subsystem.

mod monitoring;

pub use monitoring::{ConfigError, MonitoringConfig, ServerConfig};
