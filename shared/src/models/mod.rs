//! Data models for the Lookout observability subsystem.
//!
//! This module contains the observation type and the health records.

pub mod health;
pub mod observation;

pub use health::{CheckReport, CheckResult, HealthReport, ServerHealthRecord, ServerStatus};
pub use observation::{Observation, Tags};
