//! Processing statistics tracking.
//!
//! Thread-safe counters for failures and informational events, shared by all
//! site tasks of a batch through an `Arc`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::{FailureKind, InfoKind};

/// Thread-safe processing statistics tracker.
///
/// Every counter is created up front in [`ProcessingStats::new`], so increments
/// are lock-free map lookups followed by an atomic add.
pub struct ProcessingStats {
    failures: HashMap<FailureKind, AtomicUsize>,
    info: HashMap<InfoKind, AtomicUsize>,
}

impl ProcessingStats {
    pub fn new() -> Self {
        let mut failures = HashMap::new();
        for kind in FailureKind::iter() {
            failures.insert(kind, AtomicUsize::new(0));
        }

        let mut info = HashMap::new();
        for kind in InfoKind::iter() {
            info.insert(kind, AtomicUsize::new(0));
        }

        ProcessingStats { failures, info }
    }

    pub fn increment_failure(&self, kind: FailureKind) {
        if let Some(counter) = self.failures.get(&kind) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!("Failure counter for {:?} missing from ProcessingStats", kind);
        }
    }

    pub fn increment_info(&self, kind: InfoKind) {
        if let Some(counter) = self.info.get(&kind) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!("Info counter for {:?} missing from ProcessingStats", kind);
        }
    }

    pub fn get_failure_count(&self, kind: FailureKind) -> usize {
        self.failures
            .get(&kind)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn get_info_count(&self, kind: InfoKind) -> usize {
        self.info
            .get(&kind)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn total_failures(&self) -> usize {
        self.failures.values().map(|c| c.load(Ordering::SeqCst)).sum()
    }

    pub fn total_info(&self) -> usize {
        self.info.values().map(|c| c.load(Ordering::SeqCst)).sum()
    }
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new()
    }
}
