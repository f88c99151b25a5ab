//! Background collection loop.
//!
//! One task runs for the lifetime of the process. Each tick samples the
//! host, probes every enabled sibling server, runs the registered health
//! checks and prunes expired observations. A failed or panicking tick is
//! logged and followed by a backoff; only [`CollectionScheduler::stop`] ends
//! the loop.

use shared::models::ServerHealthRecord;
use shared::system::SystemSampler;
use shared::MonitoringContext;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};

use super::probe::ServerProber;

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// Host observations appended.
    pub system_observations: usize,
    /// Servers probed.
    pub servers_probed: usize,
    /// Whether every registered health check passed.
    pub checks_healthy: bool,
    /// Observations removed by the retention cleanup.
    pub expired: usize,
}

/// Performs collection ticks against a monitoring context.
#[derive(Debug)]
pub struct Collector {
    context: MonitoringContext,
    prober: ServerProber,
    sampler: Arc<Mutex<SystemSampler>>,
}

impl Collector {
    /// Creates a collector probing with `client`.
    #[must_use]
    pub fn new(context: MonitoringContext, client: reqwest::Client) -> Self {
        let prober = ServerProber::new(client, context.config().probe_timeout());
        Self {
            context,
            prober,
            sampler: Arc::new(Mutex::new(SystemSampler::new())),
        }
    }

    /// Runs one full collection pass.
    ///
    /// # Errors
    ///
    /// Returns an error if a blocking step (host sampling or the health
    /// checks) could not be joined.
    pub async fn tick(&self) -> anyhow::Result<TickReport> {
        let system_observations = self.collect_system().await?;
        let servers_probed = self.probe_servers().await;

        let registry = Arc::clone(self.context.registry());
        let checks = tokio::task::spawn_blocking(move || registry.run_all()).await?;

        let expired = self.context.store().cleanup();

        Ok(TickReport {
            system_observations,
            servers_probed,
            checks_healthy: checks.overall_healthy,
            expired,
        })
    }

    /// Samples the host and appends the results.
    ///
    /// # Errors
    ///
    /// Returns an error if the sampling task panicked.
    pub async fn collect_system(&self) -> anyhow::Result<usize> {
        let sampler = Arc::clone(&self.sampler);
        let sample = tokio::task::spawn_blocking(move || {
            sampler
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .sample()
        })
        .await?;

        let observations = sample.observations();
        let count = observations.len();
        for observation in observations {
            self.context.store().append(observation);
        }
        Ok(count)
    }

    /// Probes every enabled server in turn and records the results.
    ///
    /// Returns the number of servers probed.
    pub async fn probe_servers(&self) -> usize {
        let mut probed = 0;
        for (name, server) in self.context.config().enabled_servers() {
            let record = self.prober.probe(name, server).await;
            self.record_probe(record);
            probed += 1;
        }
        probed
    }

    fn record_probe(&self, record: ServerHealthRecord) {
        let store = self.context.store();
        let name = record.server_name.as_str();
        let status = record.status.to_string();

        store.record(
            format!("server.{name}.health"),
            record.status.as_gauge(),
            [("server", name), ("status", status.as_str())],
        );
        store.record(
            format!("server.{name}.response_time"),
            record.response_time,
            [("server", name)],
        );

        if !record.status.is_healthy() {
            tracing::warn!(
                server = %name,
                status = %status,
                error = record.error_message.as_deref().unwrap_or(""),
                "Sibling server not healthy"
            );
        }
        self.context.health().upsert(record);
    }
}

/// Timing of the collection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerTiming {
    /// Time between ticks.
    pub interval: Duration,
    /// Pause after a failed tick.
    pub error_backoff: Duration,
    /// Bounded wait when stopping.
    pub shutdown_timeout: Duration,
}

impl SchedulerTiming {
    /// Reads the timing from a monitoring context's configuration.
    #[must_use]
    pub fn from_context(context: &MonitoringContext) -> Self {
        let config = context.config();
        Self {
            interval: config.collection_interval(),
            error_backoff: config.error_backoff(),
            shutdown_timeout: config.shutdown_timeout(),
        }
    }
}

struct Running {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns the background collection task.
pub struct CollectionScheduler {
    collector: Arc<Collector>,
    timing: SchedulerTiming,
    running: Option<Running>,
}

impl CollectionScheduler {
    /// Creates a stopped scheduler.
    #[must_use]
    pub fn new(collector: Collector, timing: SchedulerTiming) -> Self {
        Self {
            collector: Arc::new(collector),
            timing,
            running: None,
        }
    }

    /// Creates a stopped scheduler for a context, timed by its configuration.
    #[must_use]
    pub fn for_context(context: &MonitoringContext, client: reqwest::Client) -> Self {
        let timing = SchedulerTiming::from_context(context);
        Self::new(Collector::new(context.clone(), client), timing)
    }

    /// Whether the background task has been started and not stopped.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// The collector driven by this scheduler.
    #[must_use]
    pub fn collector(&self) -> &Arc<Collector> {
        &self.collector
    }

    /// Spawns the background task. Returns `false` if it is already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) -> bool {
        if self.running.is_some() {
            tracing::warn!("Collection scheduler already running");
            return false;
        }

        let (stop, stopped) = watch::channel(false);
        let handle = tokio::spawn(run_loop(Arc::clone(&self.collector), self.timing, stopped));
        self.running = Some(Running { stop, handle });

        tracing::info!(
            interval_secs = self.timing.interval.as_secs(),
            "Collection scheduler started"
        );
        true
    }

    /// Signals the loop to stop and waits for it up to the shutdown timeout.
    ///
    /// Returns `true` if the task ended within the timeout. An in-flight tick
    /// is not aborted; if it outlives the timeout the task is detached.
    pub async fn stop(&mut self) -> bool {
        let Some(Running { stop, handle }) = self.running.take() else {
            return true;
        };

        // The receiver may already be gone if the task ended on its own.
        let _ = stop.send(true);

        match timeout(self.timing.shutdown_timeout, handle).await {
            Ok(Ok(())) => {
                tracing::info!("Collection scheduler stopped");
                true
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Collection scheduler task failed");
                true
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.timing.shutdown_timeout.as_secs(),
                    "Collection scheduler did not stop in time, detaching"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for CollectionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionScheduler")
            .field("timing", &self.timing)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

async fn run_loop(
    collector: Arc<Collector>,
    timing: SchedulerTiming,
    mut stopped: watch::Receiver<bool>,
) {
    let mut ticker = interval(timing.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stopped.changed() => break,
            _ = ticker.tick() => {}
        }

        // A separate task turns a panic inside the tick into a JoinError.
        let tick = tokio::spawn({
            let collector = Arc::clone(&collector);
            async move { collector.tick().await }
        });

        let failed = match tick.await {
            Ok(Ok(report)) => {
                tracing::debug!(
                    system_observations = report.system_observations,
                    servers_probed = report.servers_probed,
                    checks_healthy = report.checks_healthy,
                    expired = report.expired,
                    "Collection tick complete"
                );
                false
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Collection tick failed");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Collection tick panicked");
                true
            }
        };

        if failed {
            tokio::select! {
                _ = stopped.changed() => break,
                () = sleep(timing.error_backoff) => {}
            }
        }
    }

    tracing::debug!("Collection loop exited");
}
