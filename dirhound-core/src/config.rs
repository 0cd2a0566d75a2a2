use dirhound_scanner::ClientOptions;
use dirhound_scanner::prober::DEFAULT_USER_AGENT;
use std::collections::HashSet;
use std::time::Duration;

pub const DEFAULT_THREADS: usize = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_MAX_DEPTH: usize = 5;

pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "php", "html", "js", "txt", "xml", "json", "bak", "old", "sql", "log", "env", "config",
    "asp", "aspx", "jsp", "zip", "gz",
];

/// Tuning for soft-404 detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftNotFoundPolicy {
    /// Treat a response whose size equals a calibration sample's size as a
    /// soft-404 even when the body hash differs. Broad: it can hide real
    /// pages that happen to share the error page's size.
    pub match_size: bool,
    /// A small 401/403 size seen more than this many times becomes noise.
    pub repeat_threshold: usize,
    /// Only 401/403 bodies smaller than this are tracked.
    pub small_body_limit: u64,
}

impl Default for SoftNotFoundPolicy {
    fn default() -> Self {
        Self {
            match_size: true,
            repeat_threshold: 10,
            small_body_limit: 100,
        }
    }
}

/// Immutable settings for one scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub target: String,
    pub words: Vec<String>,
    pub threads: usize,
    pub timeout: Duration,
    pub user_agent: String,
    pub extensions: Vec<String>,
    pub recursive: bool,
    pub max_depth: usize,
    pub add_slash: bool,
    pub filter_codes: HashSet<u16>,
    pub filter_sizes: HashSet<u64>,
    /// Statuses to report. Empty means every non-404 finding.
    pub match_codes: HashSet<u16>,
    pub soft_404: SoftNotFoundPolicy,
    pub accept_invalid_certs: bool,
}

impl ScanConfig {
    pub fn new(target: impl Into<String>, words: Vec<String>) -> Self {
        Self {
            target: target.into(),
            words,
            threads: DEFAULT_THREADS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            recursive: true,
            max_depth: DEFAULT_MAX_DEPTH,
            add_slash: true,
            filter_codes: HashSet::new(),
            filter_sizes: HashSet::new(),
            match_codes: HashSet::new(),
            soft_404: SoftNotFoundPolicy::default(),
            accept_invalid_certs: true,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_recursion(mut self, recursive: bool, max_depth: usize) -> Self {
        self.recursive = recursive;
        self.max_depth = max_depth;
        self
    }

    pub fn with_add_slash(mut self, add_slash: bool) -> Self {
        self.add_slash = add_slash;
        self
    }

    pub fn with_filter_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.filter_codes = codes.into_iter().collect();
        self
    }

    pub fn with_filter_sizes(mut self, sizes: impl IntoIterator<Item = u64>) -> Self {
        self.filter_sizes = sizes.into_iter().collect();
        self
    }

    pub fn with_match_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.match_codes = codes.into_iter().collect();
        self
    }

    pub fn with_soft_404(mut self, policy: SoftNotFoundPolicy) -> Self {
        self.soft_404 = policy;
        self
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: self.timeout,
            user_agent: self.user_agent.clone(),
            accept_invalid_certs: self.accept_invalid_certs,
            ..ClientOptions::default()
        }
    }

    /// Worker channel capacity; producers block once it is full.
    pub fn backlog(&self) -> usize {
        self.threads.max(1) * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::new("example.com", vec!["admin".to_string()]);
        assert_eq!(config.threads, DEFAULT_THREADS);
        assert_eq!(config.max_depth, 5);
        assert!(config.recursive);
        assert!(config.add_slash);
        assert_eq!(config.extensions.len(), 17);
        assert!(config.soft_404.match_size);
        assert_eq!(config.soft_404.repeat_threshold, 10);
    }

    #[test]
    fn test_threads_never_zero() {
        let config = ScanConfig::new("example.com", vec![]).with_threads(0);
        assert_eq!(config.threads, 1);
        assert_eq!(config.backlog(), 4);
    }
}
