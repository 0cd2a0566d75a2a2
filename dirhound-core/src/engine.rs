//! Traversal controller.
//!
//! A scan moves through calibration, directory discovery at depth 0,
//! recursive discovery for depths 1..=max_depth, and file discovery across
//! every directory found. Each phase runs its own [`Pipeline`] batches and a
//! phase never starts before the previous one has drained, so the directory
//! registry it reads is complete.

use crate::calibrate::calibrate;
use crate::cancel::CancelSignal;
use crate::config::ScanConfig;
use crate::events::{EventCallback, Phase, ScanEvent, ScanProgress};
use crate::filter::{ResponseFilter, Verdict, is_directory, is_recursable, is_reliable};
use crate::ledger::{DirectoryRegistry, OutputLedger, VisitedSet};
use crate::output::{Finding, FindingCallback, OutputSink};
use crate::pipeline::{Job, Pipeline, ProbeMode};
use crate::stats::{ScanStats, ScanSummary};
use crate::target::{build_probe_url, normalize_target};
use dirhound_scanner::error::{Result, ScanError};
use dirhound_scanner::{ProbeResult, Prober};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

pub struct Engine {
    config: ScanConfig,
    base_url: String,
    // Cleaned wordlist: trimmed, no blanks, comments or leading slashes.
    words: Vec<String>,
    prober: Prober,
    pipeline: Pipeline,
    filter: Arc<ResponseFilter>,
    visited: VisitedSet,
    directories: DirectoryRegistry,
    output_ledger: OutputLedger,
    stats: Arc<ScanStats>,
    cancel: CancelSignal,
    output: Option<Arc<dyn OutputSink>>,
    finding_callback: Option<FindingCallback>,
    event_callback: Option<EventCallback>,
}

impl Engine {
    pub fn new(config: ScanConfig) -> Result<Self> {
        let base_url = normalize_target(&config.target);
        Url::parse(&base_url)
            .map_err(|e| ScanError::InvalidTarget(format!("{}: {}", base_url, e)))?;

        let prober = Prober::new(&config.client_options())?;
        let filter = Arc::new(ResponseFilter::new(
            config.filter_codes.clone(),
            config.filter_sizes.clone(),
            config.soft_404.clone(),
        ));
        let cancel = CancelSignal::new();
        let pipeline = Pipeline::new(
            prober.clone(),
            filter.clone(),
            cancel.clone(),
            config.threads,
            config.backlog(),
        );
        let words = clean_words(&config.words);

        Ok(Self {
            config,
            base_url,
            words,
            prober,
            pipeline,
            filter,
            visited: VisitedSet::new(),
            directories: DirectoryRegistry::new(),
            output_ledger: OutputLedger::new(),
            stats: Arc::new(ScanStats::new()),
            cancel,
            output: None,
            finding_callback: None,
            event_callback: None,
        })
    }

    pub fn with_output(mut self, output: Arc<dyn OutputSink>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_finding_callback(mut self, callback: FindingCallback) -> Self {
        self.finding_callback = Some(callback);
        self
    }

    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.event_callback = Some(callback);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn directories(&self) -> &DirectoryRegistry {
        &self.directories
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    /// Handle that stops this engine from another task.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Run the full scan. A stopped scan still returns `Ok`, with
    /// `cancelled` set in the summary.
    pub async fn run(&self) -> Result<ScanSummary> {
        let started = Instant::now();
        info!("Target: {}", self.base_url);
        info!(
            "Threads: {} | Depth: {} | Recursive: {}",
            self.config.threads, self.config.max_depth, self.config.recursive
        );
        if !self.config.extensions.is_empty() {
            info!("Extensions: {}", self.config.extensions.join(", "));
        }

        self.emit(ScanEvent::PhaseStarted {
            phase: Phase::Calibrating,
            units: 1,
        });
        let calibration = calibrate(&self.prober, &self.base_url).await;
        for baseline in &calibration.baselines {
            self.filter.add_baseline(baseline.clone());
        }
        if let (Some(size), Some(hash)) = (calibration.common_size(), calibration.common_hash()) {
            info!(
                "Calibration: size={} hash={} (sampled {})",
                size,
                hash.get(..8).unwrap_or(hash.as_str()),
                calibration.samples()
            );
        } else {
            warn!("Calibration failed, soft-404 baselines disabled");
        }
        self.emit(ScanEvent::Calibrated {
            samples: calibration.samples(),
            common_size: calibration.common_size(),
            common_hash: calibration.common_hash(),
        });

        let cancelled = self.traverse().await?;
        let final_phase = if cancelled {
            Phase::Cancelled
        } else {
            Phase::Done
        };
        info!("Scan finished: {}", final_phase);
        self.emit(ScanEvent::PhaseStarted {
            phase: final_phase,
            units: 0,
        });

        Ok(ScanSummary {
            target: self.base_url.clone(),
            stats: self.stats.snapshot(),
            duration: started.elapsed(),
            directories: self.directories.all_unique(),
            calibration_samples: calibration.samples(),
            cancelled,
        })
    }

    /// Phases 1 to 3. Returns true when stopped by cancellation.
    async fn traverse(&self) -> Result<bool> {
        if self.cancel.is_cancelled() {
            return Ok(true);
        }

        info!("Phase 1: directory discovery");
        self.emit(ScanEvent::PhaseStarted {
            phase: Phase::DirDiscovery { depth: 0 },
            units: 1,
        });
        self.scan_directories(&self.base_url, 0).await?;

        if self.config.recursive {
            for depth in 1..=self.config.max_depth {
                if self.cancel.is_cancelled() {
                    return Ok(true);
                }
                let dirs = self.directories.at_depth(depth - 1);
                if dirs.is_empty() {
                    break;
                }

                info!("Phase 2: scanning {} directories at depth {}", dirs.len(), depth);
                self.emit(ScanEvent::PhaseStarted {
                    phase: Phase::DirDiscovery { depth },
                    units: dirs.len(),
                });
                for dir in dirs {
                    if self.cancel.is_cancelled() {
                        return Ok(true);
                    }
                    self.scan_directories(&dir, depth).await?;
                }
            }
        }

        if !self.config.extensions.is_empty() {
            if self.cancel.is_cancelled() {
                return Ok(true);
            }
            let mut targets = vec![(self.base_url.clone(), 0)];
            for dir in self.directories.all_unique() {
                if dir != self.base_url {
                    let depth = self.directories.depth_of(&dir).map_or(0, |d| d + 1);
                    targets.push((dir, depth));
                }
            }

            info!(
                "Phase 3: file discovery ({} extensions, {} directories)",
                self.config.extensions.len(),
                targets.len()
            );
            self.emit(ScanEvent::PhaseStarted {
                phase: Phase::FileDiscovery,
                units: targets.len(),
            });
            for (dir, depth) in targets {
                if self.cancel.is_cancelled() {
                    return Ok(true);
                }
                self.scan_files(&dir, depth).await?;
            }
        }

        Ok(self.cancel.is_cancelled())
    }

    async fn scan_directories(&self, base: &str, depth: usize) -> Result<()> {
        let jobs = self.build_directory_jobs(base, depth);
        self.run_batch(base, jobs, ProbeMode::Fast).await
    }

    async fn scan_files(&self, base: &str, depth: usize) -> Result<()> {
        let jobs = self.build_file_jobs(base, depth);
        self.run_batch(base, jobs, ProbeMode::File).await
    }

    /// Extension-less words under `base`, bare and optionally with a
    /// trailing slash. Already-visited URLs are skipped.
    pub fn build_directory_jobs(&self, base: &str, depth: usize) -> Vec<Job> {
        let mut jobs = Vec::new();
        for word in self.words.iter().filter(|w| !w.contains('.')) {
            let url = match build_probe_url(base, word) {
                Ok(url) => url,
                Err(e) => {
                    debug!("Skipping word '{}': {}", word, e);
                    continue;
                }
            };
            if !self.visited.mark(&url, depth) {
                continue;
            }

            if self.config.add_slash && !url.ends_with('/') {
                let slash_url = format!("{}/", url);
                jobs.push(Job::new(url, depth));
                if self.visited.mark(&slash_url, depth) {
                    jobs.push(Job::new(slash_url, depth));
                }
            } else {
                jobs.push(Job::new(url, depth));
            }
        }
        jobs
    }

    /// Every word combined with every configured extension under `base`.
    pub fn build_file_jobs(&self, base: &str, depth: usize) -> Vec<Job> {
        let mut jobs = Vec::new();
        for word in &self.words {
            for ext in &self.config.extensions {
                let candidate = format!("{}.{}", word.trim_end_matches('/'), ext);
                let Ok(url) = build_probe_url(base, &candidate) else {
                    continue;
                };
                if self.visited.mark(&url, depth) {
                    jobs.push(Job::new(url, depth));
                }
            }
        }
        jobs
    }

    async fn run_batch(&self, base: &str, jobs: Vec<Job>, mode: ProbeMode) -> Result<()> {
        if jobs.is_empty() {
            return Ok(());
        }

        let mark = BatchMark::new(&self.stats, jobs.len() as u64);
        self.emit(ScanEvent::BatchStarted {
            base: base.to_string(),
            total: jobs.len(),
        });
        let ticker = self.spawn_progress_ticker(mark);

        let report = self
            .pipeline
            .run(jobs, mode, |result| self.handle_result(result, mode))
            .await;

        if let Some(ticker) = ticker {
            ticker.abort();
        }
        self.emit(ScanEvent::BatchFinished(mark.progress(&self.stats)));

        let report = report?;
        debug!(
            "Batch {} done: {}/{} results (cancelled: {})",
            base, report.received, report.submitted, report.cancelled
        );
        Ok(())
    }

    /// Consumer side of the pipeline: classify, report, register.
    fn handle_result(&self, result: ProbeResult, mode: ProbeMode) {
        self.stats.record_processed();

        match self.filter.classify(&result) {
            Verdict::Genuine => {}
            Verdict::TransportError => {
                self.stats.record_error();
                debug!("Request to {} failed: {:?}", result.url, result.error);
                return;
            }
            verdict => {
                self.stats.record_dropped();
                debug!("Dropped {} [{}] as {:?}", result.url, result.status_code, verdict);
                return;
            }
        }

        if !self.config.match_codes.is_empty()
            && !self.config.match_codes.contains(&result.status_code)
        {
            return;
        }

        // Extension brute-force results are always files.
        let is_dir = match mode {
            ProbeMode::Fast => is_directory(&result.url, result.status_code),
            ProbeMode::File => false,
        };

        self.stats.record_found();
        let finding = Finding {
            url: result.url,
            status_code: result.status_code,
            size: result.size,
            is_dir,
            depth: result.depth,
            redirect_to: result.redirect_to,
            content_type: result.content_type,
            response_time_ms: result.response_time.as_millis() as u64,
        };

        if let Some(ref callback) = self.finding_callback {
            callback(&finding);
        }

        if is_reliable(finding.status_code)
            && let Some(ref output) = self.output
            && self.output_ledger.claim(&finding.url)
            && let Err(e) = output.write_finding(&finding)
        {
            warn!("Failed to write {} to output: {}", finding.url, e);
        }

        if mode == ProbeMode::Fast
            && is_dir
            && self.config.recursive
            && finding.depth < self.config.max_depth
            && is_recursable(finding.status_code)
        {
            self.directories.register(&finding.url, finding.depth);
        }
    }

    fn spawn_progress_ticker(&self, mark: BatchMark) -> Option<JoinHandle<()>> {
        let callback = self.event_callback.clone()?;
        let stats = self.stats.clone();
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(PROGRESS_INTERVAL);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                callback(ScanEvent::Progress(mark.progress(&stats)));
            }
        }))
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(event);
        }
    }
}

/// Counter values at the start of a batch, so progress is batch-relative.
#[derive(Debug, Clone, Copy)]
struct BatchMark {
    processed: u64,
    found: u64,
    errors: u64,
    total: u64,
}

impl BatchMark {
    fn new(stats: &ScanStats, total: u64) -> Self {
        Self {
            processed: stats.processed(),
            found: stats.found(),
            errors: stats.errors(),
            total,
        }
    }

    fn progress(&self, stats: &ScanStats) -> ScanProgress {
        ScanProgress {
            processed: stats.processed().saturating_sub(self.processed),
            total: self.total,
            found: stats.found().saturating_sub(self.found),
            errors: stats.errors().saturating_sub(self.errors),
        }
    }
}

fn clean_words(words: &[String]) -> Vec<String> {
    words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty() && !w.starts_with('#'))
        .map(|w| w.trim_start_matches('/').to_string())
        .filter(|w| !w.is_empty())
        .collect()
}
