use thiserror::Error;

/// Failures that keep a scan from starting or finishing.
///
/// Per-request transport problems are not errors at this level. They travel
/// in [`crate::ProbeResult::error`] and are counted by the engine.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Invalid target URL: {0}")]
    InvalidTarget(String),

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_target_message() {
        let err = ScanError::InvalidTarget("https://exa mple.com: invalid domain character".into());
        assert_eq!(
            err.to_string(),
            "Invalid target URL: https://exa mple.com: invalid domain character"
        );
    }
}
