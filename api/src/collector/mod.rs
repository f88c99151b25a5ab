//! Periodic collection of host metrics and sibling server health.

mod probe;
mod scheduler;

pub use probe::{classify_body, ServerProber};
pub use scheduler::{CollectionScheduler, Collector, SchedulerTiming, TickReport};
