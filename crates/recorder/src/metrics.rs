use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters tracked by a single [`crate::ring::Ring`].
///
/// Mirrors the lightweight, always-on counters a ring needs to report
/// overrun/backpressure behaviour without adding a dependency on a metrics
/// crate; snapshot with [`Metrics::snapshot`].
#[derive(Debug, Default)]
pub struct Metrics {
    items_written: AtomicU64,
    items_read: AtomicU64,
    overrun_events: AtomicU64,
    catch_up_events: AtomicU64,
    commit_spins: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_items_written(&self, n: u64) {
        self.items_written.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_items_read(&self, n: u64) {
        self.items_read.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_overrun(&self) {
        self.overrun_events.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_catch_up(&self) {
        self.catch_up_events.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_commit_spins(&self, n: u64) {
        self.commit_spins.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_written: self.items_written.load(Ordering::Relaxed),
            items_read: self.items_read.load(Ordering::Relaxed),
            overrun_events: self.overrun_events.load(Ordering::Relaxed),
            catch_up_events: self.catch_up_events.load(Ordering::Relaxed),
            commit_spins: self.commit_spins.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of a [`Metrics`] block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub items_written: u64,
    pub items_read: u64,
    pub overrun_events: u64,
    pub catch_up_events: u64,
    pub commit_spins: u64,
}

impl MetricsSnapshot {
    pub fn merge(&mut self, other: MetricsSnapshot) {
        self.items_written += other.items_written;
        self.items_read += other.items_read;
        self.overrun_events += other.overrun_events;
        self.catch_up_events += other.catch_up_events;
        self.commit_spins += other.commit_spins;
    }
}
