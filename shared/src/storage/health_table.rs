//! Latest probe result per sibling server.

use crate::models::{ServerHealthRecord, ServerStatus};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// Thread-safe table holding one [`ServerHealthRecord`] per server name.
#[derive(Debug, Default)]
pub struct HealthStatusTable {
    records: RwLock<BTreeMap<String, ServerHealthRecord>>,
}

impl HealthStatusTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record for `record.server_name`.
    pub fn upsert(&self, record: ServerHealthRecord) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.server_name.clone(), record);
    }

    /// Returns the current record for a server.
    #[must_use]
    pub fn get(&self, server_name: &str) -> Option<ServerHealthRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(server_name)
            .cloned()
    }

    /// Returns a copy of every record keyed by server name.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, ServerHealthRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of records whose status is healthy.
    #[must_use]
    pub fn healthy_count(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|r| r.status == ServerStatus::Healthy)
            .count()
    }
}
