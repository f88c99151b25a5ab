//! Observation data model.
//!
//! Defines the `Observation` structure, the single kind of data point held by
//! the time-series store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered tag set attached to an observation.
pub type Tags = BTreeMap<String, String>;

/// One named, timestamped, tagged numeric data point.
///
/// Names are dot-delimited hierarchical identifiers such as
/// `system.cpu.percent` or `tool.nmap.execution_time`. Several observations
/// may share a name.
///
/// # Example
///
/// ```
/// use shared::models::Observation;
///
/// let obs = Observation::new("system.cpu.percent", 42.5).with_tag("source", "system");
///
/// assert_eq!(obs.suffix(), "percent");
/// assert_eq!(obs.tags["source"], "system");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Hierarchical metric name.
    pub name: String,

    /// Observed value.
    pub value: f64,

    /// When the value was observed.
    pub timestamp: DateTime<Utc>,

    /// Dimensions of the observation.
    #[serde(default)]
    pub tags: Tags,
}

impl Observation {
    /// Creates a new observation stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self::at(name, value, Utc::now())
    }

    /// Creates a new observation with an explicit timestamp.
    #[must_use]
    pub fn at(name: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp,
            tags: Tags::new(),
        }
    }

    /// Adds a tag to the observation.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Merges a set of tags into the observation.
    #[must_use]
    pub fn with_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tags
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Returns the last dot-delimited segment of the name.
    #[must_use]
    pub fn suffix(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}
