//! Threshold alerting on ingested observations.
//!
//! The evaluator is stateless: every observation whose value exceeds the
//! threshold configured for its name suffix produces exactly one warning.

use crate::models::Observation;
use serde::Serialize;
use std::collections::HashMap;

/// A threshold breach detected on a single observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdBreach {
    /// Full name of the offending observation.
    pub metric: String,
    /// Observed value.
    pub value: f64,
    /// Threshold that was exceeded.
    pub threshold: f64,
}

/// Checks observations against per-suffix thresholds.
///
/// The suffix is the last dot-segment of an observation's name, so a
/// `cpu_percent` threshold applies to both `system.cpu_percent` and
/// `host.a.cpu_percent`.
#[derive(Debug, Clone, Default)]
pub struct AlertEvaluator {
    thresholds: HashMap<String, f64>,
}

impl AlertEvaluator {
    /// Creates an evaluator from a suffix → threshold map.
    #[must_use]
    pub fn new(thresholds: HashMap<String, f64>) -> Self {
        Self { thresholds }
    }

    /// Returns the configured threshold for a suffix.
    #[must_use]
    pub fn threshold(&self, suffix: &str) -> Option<f64> {
        self.thresholds.get(suffix).copied()
    }

    /// Evaluates one observation, logging a warning on breach.
    pub fn evaluate(&self, observation: &Observation) -> Option<ThresholdBreach> {
        let threshold = self.threshold(observation.suffix())?;
        if observation.value <= threshold {
            return None;
        }

        tracing::warn!(
            target: "lookout::alert",
            metric = %observation.name,
            value = observation.value,
            threshold,
            "ALERT: metric exceeds threshold"
        );

        Some(ThresholdBreach {
            metric: observation.name.clone(),
            value: observation.value,
            threshold,
        })
    }
}
