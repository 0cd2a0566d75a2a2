use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Normalized outcome of a single HEAD or GET probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub url: String,
    pub status_code: u16,
    /// Body size in bytes. `None` when a HEAD response carried no usable
    /// `Content-Length`.
    pub size: Option<u64>,
    /// Hex SHA-256 of the body, empty unless the body was read.
    pub body_hash: String,
    pub content_type: Option<String>,
    /// `Location` header of 3xx responses.
    pub redirect_to: Option<String>,
    pub depth: usize,
    pub response_time: Duration,
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn new(url: String) -> Self {
        Self {
            url,
            status_code: 0,
            size: None,
            body_hash: String::new(),
            content_type: None,
            redirect_to: None,
            depth: 0,
            response_time: Duration::from_secs(0),
            error: None,
        }
    }

    pub fn with_error(url: String, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(url)
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn has_body_hash(&self) -> bool {
        !self.body_hash.is_empty()
    }
}
