use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Scan-wide counters, updated with plain atomic increments.
#[derive(Debug, Default)]
pub struct ScanStats {
    processed: AtomicU64,
    found: AtomicU64,
    errors: AtomicU64,
    dropped: AtomicU64,
}

impl ScanStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_found(&self) {
        self.found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn found(&self) -> u64 {
        self.found.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed(),
            found: self.found(),
            errors: self.errors(),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub processed: u64,
    pub found: u64,
    pub errors: u64,
    /// Responses discarded as 404, filtered or soft-404.
    pub dropped: u64,
}

/// Final report of a scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub target: String,
    pub stats: StatsSnapshot,
    pub duration: Duration,
    pub directories: Vec<String>,
    pub calibration_samples: usize,
    pub cancelled: bool,
}
