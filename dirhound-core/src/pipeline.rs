//! Bounded producer/worker/consumer pipeline used by every phase.
//!
//! One producer feeds jobs into a channel of `backlog` capacity, a fixed pool
//! of workers probes them, and results flow back through a second bounded
//! channel to the single consumer running on the caller's task. Every
//! blocking channel operation races the cancellation signal, so once it is
//! raised nothing new is enqueued or dequeued and all three sides unwind.

use crate::cancel::CancelSignal;
use crate::filter::{ResponseFilter, VERIFY_CODES};
use dirhound_scanner::error::Result;
use dirhound_scanner::{ProbeResult, Prober};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

/// One URL to probe, tagged with the recursion depth it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub url: String,
    pub depth: usize,
}

impl Job {
    pub fn new(url: String, depth: usize) -> Self {
        Self { url, depth }
    }
}

/// How a worker probes a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMode {
    /// Directory discovery: HEAD, GET only for statuses worth verifying.
    Fast,
    /// File discovery: HEAD, GET for anything not already dropped.
    File,
}

impl ProbeMode {
    /// Whether a HEAD status should be re-fetched with a body-reading GET.
    pub fn should_verify(self, status_code: u16, filter: &ResponseFilter) -> bool {
        if filter.is_dropped_status(status_code) {
            return false;
        }
        match self {
            ProbeMode::Fast => VERIFY_CODES.contains(&status_code),
            ProbeMode::File => true,
        }
    }
}

/// How a pipeline run ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub submitted: usize,
    pub received: usize,
    pub cancelled: bool,
}

/// Probe a single job: HEAD first, then GET to capture size and hash when
/// the mode asks for it. A failed GET keeps the HEAD outcome.
pub async fn probe_job(
    prober: &Prober,
    filter: &ResponseFilter,
    job: &Job,
    mode: ProbeMode,
    cancel: &CancelSignal,
) -> ProbeResult {
    let mut result = prober.head(&job.url).await;
    result.depth = job.depth;

    if result.is_error() || !mode.should_verify(result.status_code, filter) {
        return result;
    }
    // No new request once a stop was requested.
    if cancel.is_cancelled() {
        return result;
    }

    let full = prober.get_with_body(&job.url).await;
    if full.is_error() {
        debug!("Verification GET for {} failed, keeping HEAD result", job.url);
    } else {
        result.size = full.size;
        result.body_hash = full.body_hash;
        if result.content_type.is_none() {
            result.content_type = full.content_type;
        }
    }
    result.response_time += full.response_time;
    result
}

pub struct Pipeline {
    prober: Prober,
    filter: Arc<ResponseFilter>,
    cancel: CancelSignal,
    workers: usize,
    backlog: usize,
}

impl Pipeline {
    pub fn new(
        prober: Prober,
        filter: Arc<ResponseFilter>,
        cancel: CancelSignal,
        workers: usize,
        backlog: usize,
    ) -> Self {
        Self {
            prober,
            filter,
            cancel,
            workers: workers.max(1),
            backlog: backlog.max(1),
        }
    }

    /// Run `jobs` to completion, handing every result to `on_result` on the
    /// calling task. Returns once the job source is exhausted and every
    /// result has been consumed, or promptly after cancellation.
    pub async fn run<F>(&self, jobs: Vec<Job>, mode: ProbeMode, mut on_result: F) -> Result<PipelineReport>
    where
        F: FnMut(ProbeResult),
    {
        let mut report = PipelineReport {
            submitted: jobs.len(),
            ..PipelineReport::default()
        };
        if jobs.is_empty() {
            return Ok(report);
        }

        let (job_tx, job_rx) = mpsc::channel::<Job>(self.backlog);
        let (result_tx, mut result_rx) = mpsc::channel::<ProbeResult>(self.backlog);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let producer = {
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                for job in jobs {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            debug!("Producer stopped by cancellation");
                            break;
                        }
                        sent = job_tx.send(job) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                    }
                }
                // Dropping the sender closes the job channel.
            })
        };

        let worker_count = self.workers.min(report.submitted);
        let mut worker_handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let prober = self.prober.clone();
            let filter = self.filter.clone();
            let cancel = self.cancel.clone();
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();

            worker_handles.push(tokio::spawn(async move {
                loop {
                    let job = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        job = async { job_rx.lock().await.recv().await } => job,
                    };
                    let Some(job) = job else {
                        break;
                    };

                    let result = probe_job(&prober, &filter, &job, mode, &cancel).await;

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        sent = result_tx.send(result) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                    }
                }
                debug!("Worker {} finished", worker_id);
            }));
        }
        // Workers hold the remaining senders; the channel closes when the last exits.
        drop(result_tx);

        loop {
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                result = result_rx.recv() => result,
            };
            match result {
                Some(result) => {
                    report.received += 1;
                    on_result(result);
                }
                None => break,
            }
        }
        // Unblock any worker still waiting to send.
        drop(result_rx);

        producer.await?;
        for handle in worker_handles {
            handle.await?;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SoftNotFoundPolicy;
    use dirhound_scanner::ClientOptions;
    use std::collections::HashSet;
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn filter(codes: &[u16]) -> Arc<ResponseFilter> {
        Arc::new(ResponseFilter::new(
            codes.iter().copied().collect(),
            HashSet::new(),
            SoftNotFoundPolicy::default(),
        ))
    }

    fn pipeline(cancel: CancelSignal, workers: usize) -> Pipeline {
        let prober = Prober::new(&ClientOptions {
            timeout: Duration::from_secs(2),
            ..ClientOptions::default()
        })
        .unwrap();
        Pipeline::new(prober, filter(&[]), cancel, workers, workers * 4)
    }

    #[test]
    fn test_should_verify() {
        let f = filter(&[403]);
        assert!(ProbeMode::Fast.should_verify(200, &f));
        assert!(!ProbeMode::Fast.should_verify(401, &f));
        assert!(!ProbeMode::Fast.should_verify(403, &f));
        assert!(!ProbeMode::Fast.should_verify(404, &f));
        assert!(ProbeMode::File.should_verify(401, &f));
        assert!(ProbeMode::File.should_verify(500, &f));
        assert!(!ProbeMode::File.should_verify(404, &f));
    }

    #[tokio::test]
    async fn test_every_job_yields_one_result() {
        let mock_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let jobs: Vec<Job> = (0..50)
            .map(|i| Job::new(format!("{}/w{}", mock_server.uri(), i), 2))
            .collect();

        let mut seen = Vec::new();
        let report = pipeline(CancelSignal::new(), 4)
            .run(jobs, ProbeMode::Fast, |result| seen.push(result))
            .await
            .unwrap();

        assert_eq!(report.submitted, 50);
        assert_eq!(report.received, 50);
        assert!(!report.cancelled);
        assert_eq!(seen.len(), 50);
        assert!(seen.iter().all(|r| r.depth == 2 && r.status_code == 404));
        let unique: HashSet<_> = seen.iter().map(|r| r.url.clone()).collect();
        assert_eq!(unique.len(), 50);
    }

    #[tokio::test]
    async fn test_fast_mode_verifies_with_get() {
        let mock_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/admin"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin"))
            .respond_with(ResponseTemplate::new(200).set_body_string("welcome"))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/private"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/private"))
            .respond_with(ResponseTemplate::new(401))
            .expect(0)
            .mount(&mock_server)
            .await;

        let jobs = vec![
            Job::new(format!("{}/admin", mock_server.uri()), 0),
            Job::new(format!("{}/private", mock_server.uri()), 0),
        ];
        let mut seen = Vec::new();
        pipeline(CancelSignal::new(), 2)
            .run(jobs, ProbeMode::Fast, |result| seen.push(result))
            .await
            .unwrap();

        let admin = seen.iter().find(|r| r.url.ends_with("/admin")).unwrap();
        assert_eq!(admin.size, Some(7));
        assert!(admin.has_body_hash());
        let private = seen.iter().find(|r| r.url.ends_with("/private")).unwrap();
        assert!(!private.has_body_hash());
    }

    #[tokio::test]
    async fn test_cancelled_before_start_probes_nothing() {
        let mock_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let cancel = CancelSignal::new();
        cancel.cancel();
        let jobs: Vec<Job> = (0..20)
            .map(|i| Job::new(format!("{}/w{}", mock_server.uri(), i), 0))
            .collect();

        let report = pipeline(cancel, 4)
            .run(jobs, ProbeMode::Fast, |_| {})
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.received, 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_run_returns_within_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404).set_delay(Duration::from_millis(200)))
            .mount(&mock_server)
            .await;

        let cancel = CancelSignal::new();
        let jobs: Vec<Job> = (0..1000)
            .map(|i| Job::new(format!("{}/w{}", mock_server.uri(), i), 0))
            .collect();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let report = pipeline(cancel, 4)
            .run(jobs, ProbeMode::Fast, |_| {})
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(report.received < 1000);
        // in-flight requests finish, nothing new starts
        assert!(started.elapsed() < Duration::from_secs(3));

        let requests = mock_server.received_requests().await.unwrap();
        assert!(requests.len() < 1000);
    }
}
