//! Bounded in-memory time-series store.
//!
//! Provides `TimeSeriesStore`, an append-only ring of observations bounded
//! both by count (oldest evicted first on overflow) and by age (pruned by
//! [`TimeSeriesStore::cleanup`]).

use crate::alert::AlertEvaluator;
use crate::models::{Observation, Tags};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Query parameters for retrieving observations.
#[derive(Debug, Clone, Default)]
pub struct SeriesQuery {
    /// Keep only observations whose name contains this substring.
    pub name_contains: Option<String>,

    /// Keep only observations younger than this age.
    pub since: Option<Duration>,
}

impl SeriesQuery {
    /// Creates a new empty query (returns everything retained).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name substring filter.
    #[must_use]
    pub fn with_name(mut self, fragment: impl Into<String>) -> Self {
        self.name_contains = Some(fragment.into());
        self
    }

    /// Sets the maximum age filter.
    #[must_use]
    pub fn with_since(mut self, age: Duration) -> Self {
        self.since = Some(age);
        self
    }

    fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.since.and_then(|age| cutoff_before(now, age))
    }

    fn matches(&self, observation: &Observation, cutoff: Option<DateTime<Utc>>) -> bool {
        if let Some(ref fragment) = self.name_contains {
            if !observation.name.contains(fragment.as_str()) {
                return false;
            }
        }

        if let Some(cutoff) = cutoff {
            if observation.timestamp < cutoff {
                return false;
            }
        }

        true
    }
}

/// Thread-safe bounded store of observations.
///
/// Writers never block for longer than it takes to acquire the lock, and
/// never fail: an append on a full store silently evicts the oldest entry.
/// Reads return owned snapshots, so later writes are never visible in an
/// already-returned result.
#[derive(Debug)]
pub struct TimeSeriesStore {
    buffer: RwLock<VecDeque<Observation>>,
    capacity: usize,
    retention: Duration,
    alerts: AlertEvaluator,
    closed: AtomicBool,
}

impl TimeSeriesStore {
    /// Creates a new store.
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize, retention: Duration) -> Self {
        Self::with_alerts(capacity, retention, AlertEvaluator::default())
    }

    /// Creates a new store that evaluates every append against `alerts`.
    #[must_use]
    pub fn with_alerts(capacity: usize, retention: Duration, alerts: AlertEvaluator) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: RwLock::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity,
            retention,
            alerts,
            closed: AtomicBool::new(false),
        }
    }

    /// Maximum number of retained observations.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Maximum age an observation may reach before cleanup removes it.
    #[must_use]
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Appends an observation, evicting the oldest one if the store is full.
    ///
    /// Writing to a closed store is a programmer error: it panics in debug
    /// builds and is ignored in release builds.
    pub fn append(&self, observation: Observation) {
        let closed = self.is_closed();
        debug_assert!(!closed, "append to a closed TimeSeriesStore");
        if closed {
            return;
        }

        self.alerts.evaluate(&observation);

        let mut buffer = self.write();
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(observation);
    }

    /// Builds and appends an observation stamped with the current time.
    pub fn record<I, K, V>(&self, name: impl Into<String>, value: f64, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.append(Observation::new(name, value).with_tags(tags));
    }

    /// Returns the retained observations matching `query`, in insertion order.
    #[must_use]
    pub fn query(&self, query: &SeriesQuery) -> Vec<Observation> {
        let cutoff = query.cutoff(Utc::now());
        self.read()
            .iter()
            .filter(|o| query.matches(o, cutoff))
            .cloned()
            .collect()
    }

    /// Returns a copy of every retained observation, in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Observation> {
        self.read().iter().cloned().collect()
    }

    /// Returns the most recently inserted observation for every distinct name.
    #[must_use]
    pub fn latest_by_name(&self) -> BTreeMap<String, Observation> {
        let buffer = self.read();
        let mut latest = BTreeMap::new();
        for observation in buffer.iter().rev() {
            if !latest.contains_key(&observation.name) {
                latest.insert(observation.name.clone(), observation.clone());
            }
        }
        latest
    }

    /// Number of retained observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Removes every observation older than the retention period.
    ///
    /// Returns the number of removed observations.
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Utc::now())
    }

    /// Removes every observation older than `now - retention`.
    pub fn cleanup_at(&self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = cutoff_before(now, self.retention) else {
            return 0;
        };
        let mut buffer = self.write();
        let before = buffer.len();
        buffer.retain(|o| o.timestamp >= cutoff);
        let removed = before - buffer.len();

        if removed > 0 {
            tracing::debug!(removed, retained = buffer.len(), "Pruned expired observations");
        }
        removed
    }

    /// Marks the store as shut down.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`TimeSeriesStore::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn read(&self) -> RwLockReadGuard<'_, VecDeque<Observation>> {
        self.buffer.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<Observation>> {
        self.buffer.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns `now - age`, or `None` when the age reaches past the representable range.
#[must_use]
pub fn cutoff_before(now: DateTime<Utc>, age: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(age)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
}

/// Helper so callers can pass an empty tag set to [`TimeSeriesStore::record`].
#[must_use]
pub fn no_tags() -> Tags {
    Tags::new()
}
