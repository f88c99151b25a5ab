//! Host resource sampling.
//!
//! Wraps `sysinfo` to take point-in-time readings of CPU, memory, disk,
//! network, load and process count, and turns them into observations tagged
//! `source=system`.

use crate::models::Observation;
use serde::Serialize;
use std::path::Path;
use sysinfo::{Disks, Networks, ProcessesToUpdate, System};

/// One reading of host resource usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSample {
    /// Global CPU usage in percent.
    pub cpu_percent: f64,
    /// Used memory in percent of total.
    pub memory_percent: f64,
    /// Available memory in bytes.
    pub memory_available: u64,
    /// Used space on the root volume in percent.
    pub disk_percent: f64,
    /// Free space on the root volume in bytes.
    pub disk_free: u64,
    /// Total bytes sent over all interfaces since boot.
    pub network_bytes_sent: u64,
    /// Total bytes received over all interfaces since boot.
    pub network_bytes_recv: u64,
    /// 1, 5 and 15 minute load averages, when the platform has them.
    pub load_average: Option<[f64; 3]>,
    /// Number of running processes.
    pub process_count: usize,
}

impl SystemSample {
    /// Converts the sample into observations.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn observations(&self) -> Vec<Observation> {
        let system = |name: &str, value: f64| Observation::new(name, value).with_tag("source", "system");
        let bytes = |name: &str, value: u64| system(name, value as f64).with_tag("unit", "bytes");

        let mut out = vec![
            system("system.cpu.percent", self.cpu_percent),
            system("system.memory.percent", self.memory_percent),
            bytes("system.memory.available", self.memory_available),
            system("system.disk.percent", self.disk_percent),
            bytes("system.disk.free", self.disk_free),
            bytes("system.network.bytes_sent", self.network_bytes_sent),
            bytes("system.network.bytes_recv", self.network_bytes_recv),
        ];

        if let Some([one, five, fifteen]) = self.load_average {
            out.push(system("system.load.1min", one));
            out.push(system("system.load.5min", five));
            out.push(system("system.load.15min", fifteen));
        }

        out.push(system("system.process.count", self.process_count as f64));
        out
    }
}

/// Keeps `sysinfo` state between readings so CPU usage is a real delta.
pub struct SystemSampler {
    system: System,
}

impl SystemSampler {
    /// Creates a sampler and primes its CPU counters.
    #[must_use]
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        Self { system }
    }

    /// Takes a reading.
    ///
    /// CPU usage is measured since the previous call (or since construction).
    #[allow(clippy::cast_precision_loss)]
    pub fn sample(&mut self) -> SystemSample {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        self.system.refresh_processes(ProcessesToUpdate::All, true);

        let total_memory = self.system.total_memory();
        let available_memory = self.system.available_memory();
        let memory_percent = percent(total_memory.saturating_sub(available_memory), total_memory);

        let (disk_percent, disk_free) = root_disk_usage();
        let (network_bytes_sent, network_bytes_recv) = network_totals();

        let load_average = if cfg!(unix) {
            let load = System::load_average();
            Some([load.one, load.five, load.fifteen])
        } else {
            None
        };

        SystemSample {
            cpu_percent: f64::from(self.system.global_cpu_usage()),
            memory_percent,
            memory_available: available_memory,
            disk_percent,
            disk_free,
            network_bytes_sent,
            network_bytes_recv,
            load_average,
            process_count: self.system.processes().len(),
        }
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SystemSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemSampler").finish_non_exhaustive()
    }
}

/// Used percentage and free bytes of the volume mounted at `/`, falling back
/// to the largest volume.
fn root_disk_usage() -> (f64, u64) {
    let disks = Disks::new_with_refreshed_list();
    let root = disks
        .list()
        .iter()
        .find(|d| d.mount_point() == Path::new("/"))
        .or_else(|| disks.list().iter().max_by_key(|d| d.total_space()));

    match root {
        Some(disk) => {
            let total = disk.total_space();
            let free = disk.available_space();
            (percent(total.saturating_sub(free), total), free)
        }
        None => (0.0, 0),
    }
}

fn network_totals() -> (u64, u64) {
    let networks = Networks::new_with_refreshed_list();
    networks
        .list()
        .values()
        .fold((0, 0), |(sent, recv), data| {
            (
                sent + data.total_transmitted(),
                recv + data.total_received(),
            )
        })
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_sample() -> SystemSample {
        SystemSample {
            cpu_percent: 12.5,
            memory_percent: 40.0,
            memory_available: 1024,
            disk_percent: 70.0,
            disk_free: 2048,
            network_bytes_sent: 10,
            network_bytes_recv: 20,
            load_average: Some([0.5, 0.4, 0.3]),
            process_count: 42,
        }
    }

    #[test]
    fn test_percent() {
        assert!((percent(25, 100) - 25.0).abs() < f64::EPSILON);
        assert!(percent(1, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_observations_are_tagged_system() {
        let observations = fixed_sample().observations();

        assert_eq!(observations.len(), 11);
        assert!(observations.iter().all(|o| o.tags["source"] == "system"));
        assert!(observations.iter().any(|o| o.name == "system.load.15min"));
        let free = observations
            .iter()
            .find(|o| o.name == "system.disk.free")
            .unwrap();
        assert_eq!(free.tags["unit"], "bytes");
    }

    #[test]
    fn test_observations_without_load_average() {
        let sample = SystemSample {
            load_average: None,
            ..fixed_sample()
        };

        let observations = sample.observations();
        assert_eq!(observations.len(), 8);
        assert!(!observations.iter().any(|o| o.name.starts_with("system.load")));
    }

    #[test]
    fn test_live_sample_is_sane() {
        let mut sampler = SystemSampler::new();
        let sample = sampler.sample();

        assert!((0.0..=100.0).contains(&sample.memory_percent));
        assert!((0.0..=100.0).contains(&sample.disk_percent));
        assert!(sample.process_count > 0);
    }
}
