//! Progress messages sent from the stress driver to its caller via a
//! crossbeam channel.
use crate::error::RingError;
use std::time::Duration;

/// Totals for a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StressReport {
    pub duration: Duration,
    /// Elements inserted, prefill included.
    pub pushed: u64,
    /// Elements removed.
    pub popped: u64,
    /// `len()` after all workers stopped.
    pub final_len: usize,
    /// Result of the quiescent ring check.
    pub ring: Result<usize, RingError>,
}

impl StressReport {
    /// `true` if the counters add up and the ring check passed.
    pub fn is_consistent(&self) -> bool {
        let expected = self.pushed.saturating_sub(self.popped);
        self.ring.is_ok() && expected == self.final_len as u64
    }
}

#[derive(Debug)]
pub enum StressProgress {
    /// Periodic update from one worker.
    Update {
        worker: usize,
        completed_ops: usize,
        len: usize,
    },
    /// All workers finished.
    Complete(StressReport),
    /// The run was cancelled; the list may hold partial results.
    Cancelled,
}
