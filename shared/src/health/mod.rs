//! Health checks.
//!
//! - [`registry`] - the named check registry and its aggregation
//! - [`builtin`] - checks registered by default

pub mod builtin;
pub mod registry;

pub use builtin::{StoreCheck, SystemResourcesCheck, ToolsAvailabilityCheck};
pub use registry::{HealthCheck, HealthCheckRegistry};
