//! Lookout Shared Library
//!
//! This crate contains the in-process observability core used by the Lookout
//! server: a bounded observation store, threshold alerting, a health-check
//! registry, host sampling and exporters.
//!
//! # Modules
//!
//! - [`models`] - Observations and health records
//! - [`storage`] - The time-series store and the server health table
//! - [`alert`] - Threshold evaluation on every append
//! - [`health`] - Health-check registry and built-in checks
//! - [`export`] - JSON and Prometheus renderers
//! - [`config`] - Monitoring configuration
//!
//! # Example
//!
//! ```
//! use shared::models::Observation;
//! use shared::storage::{SeriesQuery, TimeSeriesStore};
//! use std::time::Duration;
//!
//! let store = TimeSeriesStore::new(2, Duration::from_secs(3600));
//! store.append(Observation::new("a.b.c", 10.0));
//! store.append(Observation::new("a.b.c", 20.0));
//! store.append(Observation::new("x.y.z", 5.0));
//!
//! let retained = store.query(&SeriesQuery::new());
//! assert_eq!(retained.len(), 2);
//! assert_eq!(retained[0].value, 20.0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod alert;
pub mod config;
pub mod context;
pub mod export;
pub mod health;
pub mod instrument;
pub mod models;
pub mod storage;
pub mod system;

pub use context::MonitoringContext;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
pub use validator;
