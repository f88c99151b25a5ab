//! In-memory storage for observations and server health.
//!
//! Both containers are process-lifetime, lock-guarded and hand out owned
//! snapshots; callers never mutate shared state through a returned value.

pub mod health_table;
pub mod series_store;

pub use health_table::HealthStatusTable;
pub use series_store::{cutoff_before, no_tags, SeriesQuery, TimeSeriesStore};
