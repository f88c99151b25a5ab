//! API route definitions.
//!
//! This module organizes all HTTP routes for the Lookout server.

mod dashboard;
mod health;
mod metrics;
mod status;

pub use dashboard::dashboard_routes;
pub use health::health_routes;
pub use metrics::metrics_routes;
pub use status::status_routes;
