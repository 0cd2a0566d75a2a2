use crate::error::{Result, ScanError};
use crate::result::ProbeResult;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response};
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};
use tracing::debug;

/// Upper bound on how much of a body is read for size/hash verification.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Transport settings for the probing client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub user_agent: String,
    pub accept_invalid_certs: bool,
    pub pool_max_idle_per_host: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_invalid_certs: true,
            pool_max_idle_per_host: 100,
        }
    }
}

/// Issues single HEAD/GET probes and normalizes the outcome.
///
/// Redirects are never followed, so 3xx statuses reach the classifier as-is.
/// Probes never fail: transport problems are reported through
/// [`ProbeResult::error`].
#[derive(Clone)]
pub struct Prober {
    client: Client,
}

impl Prober {
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(options.user_agent.as_str())
            .timeout(options.timeout)
            .connect_timeout(options.timeout)
            .pool_max_idle_per_host(options.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(ScanError::ClientBuild)?;

        Ok(Self { client })
    }

    /// HEAD probe. Size comes from the `Content-Length` header only.
    pub async fn head(&self, url: &str) -> ProbeResult {
        let start = Instant::now();
        let response = match self.client.head(url).header(ACCEPT, "*/*").send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("HEAD {} failed: {}", url, e);
                return ProbeResult::with_error(url.to_string(), e.to_string());
            }
        };

        let mut result = Self::from_response(url, &response);
        result.size = Self::declared_length(&response);
        result.response_time = start.elapsed();
        result
    }

    /// GET probe that reads up to [`MAX_BODY_BYTES`] of the body and hashes it.
    pub async fn get_with_body(&self, url: &str) -> ProbeResult {
        let start = Instant::now();
        let response = match self
            .client
            .get(url)
            .header(ACCEPT, BROWSER_ACCEPT)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("GET {} failed: {}", url, e);
                return ProbeResult::with_error(url.to_string(), e.to_string());
            }
        };

        let mut result = Self::from_response(url, &response);
        match read_capped(response, MAX_BODY_BYTES).await {
            Ok(body) => {
                result.size = Some(body.len() as u64);
                result.body_hash = hash_body(&body);
            }
            Err(e) => {
                debug!("Reading body of {} failed: {}", url, e);
                result.error = Some(e.to_string());
            }
        }
        result.response_time = start.elapsed();
        result
    }

    fn from_response(url: &str, response: &Response) -> ProbeResult {
        let status_code = response.status().as_u16();
        let headers = response.headers();

        let mut result = ProbeResult::new(url.to_string());
        result.status_code = status_code;
        result.content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        if (300..400).contains(&status_code) {
            result.redirect_to = headers
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(String::from);
        }
        result
    }

    // reqwest reports an empty body for HEAD, so read the header directly.
    fn declared_length(response: &Response) -> Option<u64> {
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }
}

async fn read_capped(mut response: Response, cap: usize) -> reqwest::Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let remaining = cap - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Hex SHA-256 digest used to fingerprint response bodies.
pub fn hash_body(body: &[u8]) -> String {
    format!("{:x}", Sha256::digest(body))
}
