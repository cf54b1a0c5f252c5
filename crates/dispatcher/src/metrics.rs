//! Dispatcher metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every clone of a dispatcher
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Total dispatch calls
    dispatched: AtomicU64,
    /// Notifications accepted by a sender
    delivered: AtomicU64,
    /// Calls rejected for lack of a route
    no_route: AtomicU64,
    /// Sender failures
    failed: AtomicU64,
}

impl DispatcherMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total dispatch count
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Increment dispatch count
    pub fn inc_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Get delivered count
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Increment delivered count
    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Get no-route count
    pub fn no_route(&self) -> u64 {
        self.no_route.load(Ordering::Relaxed)
    }

    /// Increment no-route count
    pub fn inc_no_route(&self) {
        self.no_route.fetch_add(1, Ordering::Relaxed);
    }

    /// Get failure count
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Increment failure count
    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            dispatched: self.dispatched(),
            delivered: self.delivered(),
            no_route: self.no_route(),
            failed: self.failed(),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub dispatched: u64,
    pub delivered: u64,
    pub no_route: u64,
    pub failed: u64,
}
