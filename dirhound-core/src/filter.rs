//! Result classification: hard-404s, user filters, soft-404 detection and
//! the directory-vs-file decision.
//!
//! Soft-404s are caught two ways. Calibration samples give fixed baselines
//! (body hash and size). Small 401/403 bodies whose exact size keeps
//! repeating are learned during the scan; once a size crosses the threshold
//! it stays noise for the rest of the run.

use crate::config::SoftNotFoundPolicy;
use crate::target::last_segment;
use dirhound_scanner::ProbeResult;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock};

/// Statuses that mark a redirect-style directory.
pub const REDIRECT_CODES: [u16; 4] = [301, 302, 307, 308];

/// Statuses a directory must have to be recursed into.
pub const RECURSE_CODES: [u16; 5] = [200, 301, 302, 307, 308];

/// Statuses worth persisting to the output sink.
pub const RELIABLE_CODES: [u16; 10] = [200, 201, 204, 301, 302, 307, 308, 401, 403, 405];

/// Statuses the fast directory probe verifies with a GET.
pub const VERIFY_CODES: [u16; 4] = [200, 301, 302, 403];

/// One calibration sample of the target's "not found" page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub body_hash: String,
    pub size: u64,
}

/// Why a result was kept or dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    TransportError,
    NotFound,
    FilteredCode,
    ServerError,
    FilteredSize,
    SoftNotFound,
    RepetitiveSize,
    Genuine,
}

pub struct ResponseFilter {
    filter_codes: HashSet<u16>,
    filter_sizes: HashSet<u64>,
    policy: SoftNotFoundPolicy,
    baselines: RwLock<Vec<Baseline>>,
    // Unknown sizes share one bucket.
    size_counts: Mutex<HashMap<Option<u64>, usize>>,
}

impl ResponseFilter {
    pub fn new(
        filter_codes: HashSet<u16>,
        filter_sizes: HashSet<u64>,
        policy: SoftNotFoundPolicy,
    ) -> Self {
        Self {
            filter_codes,
            filter_sizes,
            policy,
            baselines: RwLock::new(Vec::new()),
            size_counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_baseline(&self, baseline: Baseline) {
        self.baselines
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(baseline);
    }

    pub fn baselines(&self) -> Vec<Baseline> {
        self.baselines
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Hard-404 or user-filtered status. Workers skip GET verification for these.
    pub fn is_dropped_status(&self, status_code: u16) -> bool {
        status_code == 404 || self.filter_codes.contains(&status_code)
    }

    /// Run the checks in order and stop at the first one that drops the result.
    pub fn classify(&self, result: &ProbeResult) -> Verdict {
        if result.is_error() {
            return Verdict::TransportError;
        }
        if result.status_code == 404 {
            return Verdict::NotFound;
        }
        if self.filter_codes.contains(&result.status_code) {
            return Verdict::FilteredCode;
        }
        if result.status_code >= 500 {
            return Verdict::ServerError;
        }
        if let Some(size) = result.size
            && self.filter_sizes.contains(&size)
        {
            return Verdict::FilteredSize;
        }
        if self.is_soft_404(&result.body_hash, result.size) {
            return Verdict::SoftNotFound;
        }
        if self.track_repetitive_size(result.size, result.status_code) {
            return Verdict::RepetitiveSize;
        }
        Verdict::Genuine
    }

    /// Compare against calibration baselines. Does not mutate any state.
    pub fn is_soft_404(&self, body_hash: &str, size: Option<u64>) -> bool {
        let baselines = self.baselines.read().unwrap_or_else(|e| e.into_inner());
        baselines.iter().any(|baseline| {
            if !body_hash.is_empty() && baseline.body_hash == body_hash {
                return true;
            }
            self.policy.match_size && baseline.size > 0 && size == Some(baseline.size)
        })
    }

    /// Count small 401/403 sizes; true once a size has been seen more than
    /// the repeat threshold.
    pub fn track_repetitive_size(&self, size: Option<u64>, status_code: u16) -> bool {
        if status_code != 401 && status_code != 403 {
            return false;
        }
        if size.is_some_and(|s| s >= self.policy.small_body_limit) {
            return false;
        }

        let mut counts = self.size_counts.lock().unwrap_or_else(|e| e.into_inner());
        let count = counts.entry(size).or_insert(0);
        *count += 1;
        *count > self.policy.repeat_threshold
    }
}

/// Redirect statuses, a trailing slash, or an extension-less last segment
/// all mean directory.
pub fn is_directory(url: &str, status_code: u16) -> bool {
    if REDIRECT_CODES.contains(&status_code) {
        return true;
    }
    if url.ends_with('/') {
        return true;
    }
    !last_segment(url).contains('.')
}

pub fn is_reliable(status_code: u16) -> bool {
    RELIABLE_CODES.contains(&status_code)
}

pub fn is_recursable(status_code: u16) -> bool {
    RECURSE_CODES.contains(&status_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ResponseFilter {
        ResponseFilter::new(
            HashSet::from([400]),
            HashSet::from([1234]),
            SoftNotFoundPolicy::default(),
        )
    }

    fn result(status: u16, size: u64, hash: &str) -> ProbeResult {
        let mut r = ProbeResult::new("http://example.com/x".to_string());
        r.status_code = status;
        r.size = Some(size);
        r.body_hash = hash.to_string();
        r
    }

    #[test]
    fn test_order_of_checks() {
        let f = filter();
        f.add_baseline(Baseline {
            body_hash: "deadbeef".to_string(),
            size: 512,
        });

        let errored = ProbeResult::with_error("http://e/x".to_string(), "refused".to_string());
        assert_eq!(f.classify(&errored), Verdict::TransportError);
        assert_eq!(f.classify(&result(404, 512, "deadbeef")), Verdict::NotFound);
        assert_eq!(f.classify(&result(400, 10, "")), Verdict::FilteredCode);
        assert_eq!(f.classify(&result(503, 512, "")), Verdict::ServerError);
        assert_eq!(f.classify(&result(200, 1234, "")), Verdict::FilteredSize);
        assert_eq!(f.classify(&result(200, 99, "deadbeef")), Verdict::SoftNotFound);
        assert_eq!(f.classify(&result(200, 100, "cafe")), Verdict::Genuine);
    }

    #[test]
    fn test_size_only_match_is_soft_404() {
        let f = filter();
        f.add_baseline(Baseline {
            body_hash: "aaaa".to_string(),
            size: 512,
        });
        assert_eq!(f.classify(&result(200, 512, "bbbb")), Verdict::SoftNotFound);
    }

    #[test]
    fn test_size_match_can_be_disabled() {
        let f = ResponseFilter::new(
            HashSet::new(),
            HashSet::new(),
            SoftNotFoundPolicy {
                match_size: false,
                ..SoftNotFoundPolicy::default()
            },
        );
        f.add_baseline(Baseline {
            body_hash: "aaaa".to_string(),
            size: 512,
        });
        assert_eq!(f.classify(&result(200, 512, "bbbb")), Verdict::Genuine);
        assert_eq!(f.classify(&result(200, 7, "aaaa")), Verdict::SoftNotFound);
    }

    #[test]
    fn test_zero_size_baseline_matches_by_hash_only() {
        let f = filter();
        f.add_baseline(Baseline {
            body_hash: "empty".to_string(),
            size: 0,
        });
        assert!(!f.is_soft_404("other", Some(0)));
        assert!(f.is_soft_404("empty", Some(0)));
    }

    #[test]
    fn test_soft_404_is_idempotent() {
        let f = filter();
        f.add_baseline(Baseline {
            body_hash: "h".to_string(),
            size: 300,
        });
        assert!(f.is_soft_404("h", Some(300)));
        assert!(f.is_soft_404("h", Some(300)));
        assert_eq!(f.classify(&result(200, 300, "h")), Verdict::SoftNotFound);
        assert_eq!(f.classify(&result(200, 300, "h")), Verdict::SoftNotFound);
    }

    #[test]
    fn test_no_baselines_means_no_baseline_filtering() {
        let f = filter();
        assert!(!f.is_soft_404("", Some(512)));
        assert!(!f.is_soft_404("", None));
    }

    #[test]
    fn test_repetitive_size_threshold() {
        let f = filter();
        for _ in 0..10 {
            assert_eq!(f.classify(&result(403, 50, "")), Verdict::Genuine);
        }
        // 11th and later occurrences are noise, for 401 as well
        assert_eq!(f.classify(&result(403, 50, "")), Verdict::RepetitiveSize);
        assert_eq!(f.classify(&result(401, 50, "")), Verdict::RepetitiveSize);
        for _ in 0..20 {
            assert_eq!(f.classify(&result(403, 50, "")), Verdict::RepetitiveSize);
        }
        // other sizes are unaffected
        assert_eq!(f.classify(&result(403, 51, "")), Verdict::Genuine);
    }

    #[test]
    fn test_repetitive_size_only_tracks_small_auth_errors() {
        let f = filter();
        for _ in 0..30 {
            assert!(!f.track_repetitive_size(Some(50), 200));
            assert!(!f.track_repetitive_size(Some(150), 403));
        }
    }

    #[test]
    fn test_is_directory() {
        assert!(is_directory("http://e.com/admin", 200));
        assert!(is_directory("http://e.com/admin/", 403));
        assert!(is_directory("http://e.com/index.php", 301));
        assert!(is_directory("http://e.com/v1.2/", 200));
        assert!(!is_directory("http://e.com/index.php", 200));
    }

    #[test]
    fn test_status_sets() {
        assert!(is_reliable(405));
        assert!(!is_reliable(400));
        assert!(is_recursable(307));
        assert!(!is_recursable(403));
    }
}
