//! Re-sequencing stage for `OrderingMode::Submission`
//!
//! Workers finish out of order; the reorderer holds early results until every
//! lower sequence number has been released.
//!
//! The hold-back buffer is bounded by a [`ReorderWindow`]: a worker may only
//! emit sequence `seq` once `seq < released + size`, where `released` is the
//! reorderer's next expected sequence, published by the sink task.

use std::collections::BTreeMap;

use tokio::sync::watch;

/// Releases values in sequence-number order
#[derive(Debug)]
pub struct Reorderer<T> {
    next_seq: u64,
    pending: BTreeMap<u64, T>,
}

impl<T> Reorderer<T> {
    /// Create a reorderer expecting sequence 0 first
    pub fn new() -> Self {
        Self {
            next_seq: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Accept one value and return every value now releasable, in order
    pub fn push(&mut self, seq: u64, value: T) -> Vec<T> {
        debug_assert!(seq >= self.next_seq, "sequence {seq} already released");
        self.pending.insert(seq, value);

        let mut ready = Vec::new();
        while let Some(value) = self.pending.remove(&self.next_seq) {
            ready.push(value);
            self.next_seq += 1;
        }
        ready
    }

    /// Release everything still held, in sequence order
    ///
    /// Used at end of stream, where gaps are sequence numbers that never
    /// produced a result (abandoned on cancellation).
    pub fn drain(&mut self) -> Vec<T> {
        let pending = std::mem::take(&mut self.pending);
        if let Some((&last, _)) = pending.last_key_value() {
            self.next_seq = last + 1;
        }
        pending.into_values().collect()
    }

    /// Number of values waiting for a lower sequence number
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Next sequence number the reorderer will release
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }
}

impl<T> Default for Reorderer<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a release window of `size` sequence numbers
///
/// The sender side is owned by the sink task and updated after every push.
pub(crate) fn reorder_window(size: usize) -> (watch::Sender<u64>, ReorderWindow) {
    let (tx, rx) = watch::channel(0);
    let window = ReorderWindow {
        released: rx,
        size: size.max(1) as u64,
    };
    (tx, window)
}

/// Worker-side admission check bounding the reorderer's hold-back buffer
#[derive(Debug, Clone)]
pub(crate) struct ReorderWindow {
    released: watch::Receiver<u64>,
    size: u64,
}

impl ReorderWindow {
    /// Whether `seq` may be emitted right now
    pub fn admits(&self, seq: u64) -> bool {
        seq < self.released.borrow().saturating_add(self.size)
    }

    /// Suspend until `seq` fits in the window
    ///
    /// Returns immediately if the sink task is gone; the following emit
    /// then fails on the closed output queue.
    pub async fn admit(&self, seq: u64) {
        let size = self.size;
        let mut released = self.released.clone();
        let _ = released
            .wait_for(|next| seq < next.saturating_add(size))
            .await;
    }
}
