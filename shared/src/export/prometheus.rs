//! Prometheus text exposition.
//!
//! Emits latest-value gauges: for every distinct name only the most recently
//! inserted observation is rendered.

use crate::models::Observation;
use std::fmt::Write as _;

/// Replaces `.` and `-` with `_`.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    name.replace(['.', '-'], "_")
}

/// Renders the text document for `latest` observations under `prefix`.
///
/// A single `# HELP` / `# TYPE` pair precedes one line per observation.
pub fn render<'a, I>(prefix: &str, latest: I) -> String
where
    I: IntoIterator<Item = &'a Observation>,
{
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(
        out,
        "# HELP {prefix}_system_metrics System metrics collected by lookout"
    );
    let _ = write!(out, "# TYPE {prefix}_system_metrics gauge");

    for observation in latest {
        let _ = write!(
            out,
            "\n{prefix}_{}{} {}",
            sanitize_name(&observation.name),
            labels(observation),
            format_value(observation.value)
        );
    }

    out
}

fn labels(observation: &Observation) -> String {
    if observation.tags.is_empty() {
        return String::new();
    }

    let pairs: Vec<String> = observation
        .tags
        .iter()
        .map(|(k, v)| format!("{k}=\"{}\"", escape_label_value(v)))
        .collect();
    format!("{{{}}}", pairs.join(","))
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else {
        value.to_string()
    }
}
