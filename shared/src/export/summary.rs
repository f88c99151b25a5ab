//! Per-name summary statistics.

use crate::models::Observation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate statistics for every observation sharing one name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Number of observations.
    pub count: usize,
    /// Arithmetic mean.
    pub avg: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Most recently inserted value.
    pub latest: f64,
}

impl MetricSummary {
    fn first(value: f64) -> Self {
        Self {
            count: 1,
            avg: value,
            min: value,
            max: value,
            latest: value,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.avg += (value - self.avg) / self.count as f64;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.latest = value;
    }
}

/// Summarizes observations by name, assuming insertion order.
#[must_use]
pub fn summarize<'a, I>(observations: I) -> BTreeMap<String, MetricSummary>
where
    I: IntoIterator<Item = &'a Observation>,
{
    let mut summaries: BTreeMap<String, MetricSummary> = BTreeMap::new();
    for observation in observations {
        match summaries.get_mut(&observation.name) {
            Some(summary) => summary.push(observation.value),
            None => {
                summaries.insert(
                    observation.name.clone(),
                    MetricSummary::first(observation.value),
                );
            }
        }
    }
    summaries
}
