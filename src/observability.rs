//! Scan metrics (in-process counters, reported through tracing)

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    cycles_completed: AtomicU64,
    keys_discovered: AtomicU64,
    store_failures: AtomicU64,
    tasks_failed: AtomicU64,
    notifications_sent: AtomicU64,
    notifications_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cycle_completed(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "cycles_completed", "Metric incremented");
    }

    pub fn keys_discovered(&self, count: usize) {
        self.keys_discovered.fetch_add(count as u64, Ordering::Relaxed);
        tracing::debug!(counter = "keys_discovered", count, "Metric incremented");
    }

    pub fn store_failed(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "store_failures", "Metric incremented");
    }

    /// A scan task panicked or was cancelled; its source produced nothing
    pub fn task_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_failed", "Metric incremented");
    }

    pub fn notification_sent(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "notifications_sent", "Metric incremented");
    }

    pub fn notification_failed(&self) {
        self.notifications_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "notifications_failed", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            keys_discovered: self.keys_discovered.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cycles_completed: u64,
    pub keys_discovered: u64,
    pub store_failures: u64,
    pub tasks_failed: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
}
