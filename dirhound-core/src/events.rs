use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Traversal state, in the order a scan moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Calibrating,
    DirDiscovery { depth: usize },
    FileDiscovery,
    Done,
    Cancelled,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Calibrating => write!(f, "calibration"),
            Phase::DirDiscovery { depth: 0 } => write!(f, "directory discovery"),
            Phase::DirDiscovery { depth } => write!(f, "recursive discovery (depth {})", depth),
            Phase::FileDiscovery => write!(f, "file discovery"),
            Phase::Done => write!(f, "done"),
            Phase::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Counters for the pipeline batch currently running
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScanProgress {
    pub processed: u64,
    pub total: u64,
    pub found: u64,
    pub errors: u64,
}

impl ScanProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.processed as f64 / self.total as f64 * 100.0).min(100.0)
    }
}

/// Observational notices for the progress/log sink.
#[derive(Debug, Clone, Serialize)]
pub enum ScanEvent {
    PhaseStarted {
        phase: Phase,
        /// Directories (phase 2 and 3) or 1 for the base scan.
        units: usize,
    },
    Calibrated {
        samples: usize,
        common_size: Option<u64>,
        common_hash: Option<String>,
    },
    BatchStarted {
        base: String,
        total: usize,
    },
    Progress(ScanProgress),
    BatchFinished(ScanProgress),
}

/// Receives every phase notice and periodic progress tick
pub type EventCallback = Arc<dyn Fn(ScanEvent) + Send + Sync>;
