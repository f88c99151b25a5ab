//! Ad hoc instrumentation of named operations.
//!
//! Used by code that runs work on behalf of a caller (tool executions,
//! internal functions) to report duration and success or failure into the
//! store without touching the store's naming scheme directly.

use crate::storage::TimeSeriesStore;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How a tool execution ended, as judged by its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToolOutcome {
    /// The tool reported success.
    pub success: bool,
    /// The tool was stopped by its own timeout.
    pub timed_out: bool,
}

impl ToolOutcome {
    /// A successful run.
    #[must_use]
    pub fn succeeded() -> Self {
        Self {
            success: true,
            timed_out: false,
        }
    }

    /// A run that completed but reported failure.
    #[must_use]
    pub fn failed() -> Self {
        Self::default()
    }

    /// A run that was cut short by its timeout.
    #[must_use]
    pub fn timed_out() -> Self {
        Self {
            success: false,
            timed_out: true,
        }
    }

    fn status(self) -> &'static str {
        if self.success {
            "success"
        } else {
            "failed"
        }
    }
}

/// Writes operation observations into a store.
#[derive(Debug, Clone)]
pub struct OperationRecorder {
    store: Arc<TimeSeriesStore>,
}

impl OperationRecorder {
    /// Creates a recorder writing into `store`.
    #[must_use]
    pub fn new(store: Arc<TimeSeriesStore>) -> Self {
        Self { store }
    }

    /// Records the start of a tool execution.
    pub fn tool_started(&self, tool: &str) {
        self.store.record(
            format!("tool.{tool}.executions.started"),
            1.0,
            [("tool", tool)],
        );
    }

    /// Records a tool execution that returned a result.
    pub fn tool_finished(&self, tool: &str, elapsed: Duration, outcome: ToolOutcome) {
        let status = outcome.status();
        self.store.record(
            format!("tool.{tool}.execution_time"),
            elapsed.as_secs_f64(),
            [("tool", tool), ("status", status)],
        );
        self.store.record(
            format!("tool.{tool}.executions.completed"),
            1.0,
            [("tool", tool), ("status", status)],
        );
        if outcome.timed_out {
            self.store
                .record(format!("tool.{tool}.timeouts"), 1.0, [("tool", tool)]);
        }
    }

    /// Records a tool execution that failed before producing a result.
    pub fn tool_errored(&self, tool: &str, elapsed: Duration, error_type: &str) {
        self.store.record(
            format!("tool.{tool}.execution_time"),
            elapsed.as_secs_f64(),
            [("tool", tool), ("status", "error"), ("error_type", error_type)],
        );
        self.store.record(
            format!("tool.{tool}.errors"),
            1.0,
            [("tool", tool), ("error_type", error_type)],
        );
    }

    /// Records a successful function call.
    pub fn function_succeeded(&self, name: &str, elapsed: Duration) {
        self.store.record(
            format!("function.{name}.duration"),
            elapsed.as_secs_f64(),
            [("status", "success")],
        );
        self.store
            .record(format!("function.{name}.calls"), 1.0, [("status", "success")]);
    }

    /// Records a failed function call.
    pub fn function_failed(&self, name: &str, elapsed: Duration, error_type: &str) {
        self.store.record(
            format!("function.{name}.duration"),
            elapsed.as_secs_f64(),
            [("status", "error"), ("error_type", error_type)],
        );
        self.store.record(
            format!("function.{name}.errors"),
            1.0,
            [("error_type", error_type)],
        );
    }

    /// Awaits a fallible operation and records it as a function call.
    ///
    /// # Errors
    ///
    /// Returns the operation's own error unchanged.
    pub async fn timed<F, T, E>(&self, name: &str, operation: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let result = operation.await;
        match &result {
            Ok(_) => self.function_succeeded(name, started.elapsed()),
            Err(_) => self.function_failed(name, started.elapsed(), short_type_name::<E>()),
        }
        result
    }

    /// Awaits a tool execution and records its lifecycle.
    ///
    /// `classify` inspects a returned result to decide whether the tool
    /// succeeded or timed out.
    ///
    /// # Errors
    ///
    /// Returns the execution's own error unchanged.
    pub async fn timed_tool<F, T, E, C>(&self, tool: &str, execution: F, classify: C) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        C: FnOnce(&T) -> ToolOutcome,
    {
        self.tool_started(tool);
        let started = Instant::now();
        let result = execution.await;
        match &result {
            Ok(value) => self.tool_finished(tool, started.elapsed(), classify(value)),
            Err(_) => self.tool_errored(tool, started.elapsed(), short_type_name::<E>()),
        }
        result
    }
}

/// Last path segment of a type's name, e.g. `Error` for `std::io::Error`.
#[must_use]
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SeriesQuery;

    fn recorder() -> (OperationRecorder, Arc<TimeSeriesStore>) {
        let store = Arc::new(TimeSeriesStore::new(100, Duration::from_secs(3600)));
        (OperationRecorder::new(Arc::clone(&store)), store)
    }

    fn names(store: &TimeSeriesStore) -> Vec<String> {
        store.snapshot().into_iter().map(|o| o.name).collect()
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<std::io::Error>(), "Error");
        assert_eq!(short_type_name::<std::num::ParseIntError>(), "ParseIntError");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
    }

    #[test]
    fn test_timed_success() {
        let (recorder, store) = recorder();

        let value = tokio_test::block_on(
            recorder.timed("scan.parse", async { Ok::<_, std::io::Error>(7) }),
        )
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(
            names(&store),
            vec!["function.scan.parse.duration", "function.scan.parse.calls"]
        );
    }

    #[tokio::test]
    async fn test_timed_failure_tags_error_type() {
        let (recorder, store) = recorder();

        let result = recorder
            .timed("scan.parse", async { "x".parse::<u32>() })
            .await;

        assert!(result.is_err());
        let errors = store.query(&SeriesQuery::new().with_name("function.scan.parse.errors"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].tags["error_type"], "ParseIntError");
    }

    #[tokio::test]
    async fn test_timed_tool_records_timeout() {
        let (recorder, store) = recorder();

        let _ = recorder
            .timed_tool(
                "nmap",
                async { Ok::<_, std::io::Error>("partial") },
                |_| ToolOutcome::timed_out(),
            )
            .await;

        assert_eq!(
            names(&store),
            vec![
                "tool.nmap.executions.started",
                "tool.nmap.execution_time",
                "tool.nmap.executions.completed",
                "tool.nmap.timeouts",
            ]
        );
        let completed = store.query(&SeriesQuery::new().with_name("executions.completed"));
        assert_eq!(completed[0].tags["status"], "failed");
    }

    #[tokio::test]
    async fn test_timed_tool_error() {
        let (recorder, store) = recorder();

        let result: Result<(), std::io::Error> = recorder
            .timed_tool(
                "hydra",
                async { Err(std::io::Error::other("spawn failed")) },
                |_| ToolOutcome::succeeded(),
            )
            .await;

        assert!(result.is_err());
        let time = store.query(&SeriesQuery::new().with_name("tool.hydra.execution_time"));
        assert_eq!(time[0].tags["status"], "error");
        assert_eq!(
            store
                .query(&SeriesQuery::new().with_name("tool.hydra.errors"))
                .len(),
            1
        );
    }
}
