pub mod calibrate;
pub mod cancel;
pub mod config;
pub mod engine;
pub mod events;
pub mod filter;
pub mod ledger;
pub mod output;
pub mod pipeline;
pub mod stats;
pub mod target;
pub mod wordlist;

pub use cancel::CancelSignal;
pub use config::{ScanConfig, SoftNotFoundPolicy};
pub use engine::Engine;
pub use events::{EventCallback, Phase, ScanEvent, ScanProgress};
pub use output::{Finding, FindingCallback, OutputFormat, OutputSink, OutputWriter};
pub use stats::{ScanStats, ScanSummary, StatsSnapshot};
