//! Integration tests for the Lookout API.
//!
//! These tests drive the full router, including the instrumentation and
//! panic layers, and run the collector against real loopback servers.

#[path = "integration_tests/common/mod.rs"]
mod common;
#[path = "integration_tests/collector_tests.rs"]
mod collector_tests;
#[path = "integration_tests/dashboard_tests.rs"]
mod dashboard_tests;
#[path = "integration_tests/health_tests.rs"]
mod health_tests;
#[path = "integration_tests/instrumentation_tests.rs"]
mod instrumentation_tests;
#[path = "integration_tests/metrics_tests.rs"]
mod metrics_tests;
