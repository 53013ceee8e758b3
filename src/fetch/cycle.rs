// Fetch-cycle sequencing: a newer cycle supersedes older ones regardless of arrival order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Default)]
pub struct CycleTracker {
    latest: Arc<AtomicU64>,
}

/// Handle for one started cycle.
#[derive(Debug, Clone)]
pub struct CycleTicket {
    seq: u64,
    latest: Arc<AtomicU64>,
}

impl CycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new cycle; every previously issued ticket becomes stale.
    pub fn begin(&self) -> CycleTicket {
        let seq = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        CycleTicket {
            seq,
            latest: self.latest.clone(),
        }
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }
}

impl CycleTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::Acquire) == self.seq
    }
}
