//! Pipeline configuration and metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

pub use contracts::{OrderingMode, PipelineConfig, ShutdownPolicy};

use crate::error::PipelineError;

/// Reject configurations that cannot run
pub(crate) fn check_config(config: &PipelineConfig) -> Result<(), PipelineError> {
    if config.worker_count == 0 {
        return Err(PipelineError::invalid_config("worker_count must be >= 1"));
    }
    if config.queue_capacity == 0 {
        return Err(PipelineError::invalid_config("queue_capacity must be >= 1"));
    }
    Ok(())
}

/// Pipeline metrics
///
/// Shared by the handle, the workers and the coordinator.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Items accepted by `submit`
    pub items_submitted: AtomicU64,

    /// Items transformed successfully
    pub items_succeeded: AtomicU64,

    /// Items whose transform failed
    pub items_failed: AtomicU64,

    /// Items discarded on cancellation
    pub items_abandoned: AtomicU64,

    /// Current input queue length
    pub queue_len: AtomicUsize,
}

impl PipelineMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record item submitted
    pub fn record_submitted(&self) {
        self.items_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record transform outcome
    pub fn record_completed(&self, success: bool) {
        if success {
            self.items_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.items_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record items abandoned on cancellation
    pub fn record_abandoned(&self, count: u64) {
        self.items_abandoned.fetch_add(count, Ordering::Relaxed);
    }

    /// Update queue length
    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_submitted: self.items_submitted.load(Ordering::Relaxed),
            items_succeeded: self.items_succeeded.load(Ordering::Relaxed),
            items_failed: self.items_failed.load(Ordering::Relaxed),
            items_abandoned: self.items_abandoned.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Items accepted by `submit`
    pub items_submitted: u64,

    /// Items transformed successfully
    pub items_succeeded: u64,

    /// Items whose transform failed
    pub items_failed: u64,

    /// Items discarded on cancellation
    pub items_abandoned: u64,

    /// Current input queue length
    pub queue_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_config() {
        assert!(check_config(&PipelineConfig::default()).is_ok());
        assert!(matches!(
            check_config(&PipelineConfig::with_workers(0)),
            Err(PipelineError::InvalidConfig { .. })
        ));
        let zero_capacity = PipelineConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(check_config(&zero_capacity).is_err());
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = PipelineMetrics::new();
        metrics.record_submitted();
        metrics.record_submitted();
        metrics.record_completed(true);
        metrics.record_completed(false);
        metrics.record_abandoned(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.items_submitted, 2);
        assert_eq!(snapshot.items_succeeded, 1);
        assert_eq!(snapshot.items_failed, 1);
        assert_eq!(snapshot.items_abandoned, 3);
    }
}
