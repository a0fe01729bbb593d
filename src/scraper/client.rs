//! Blocking HTTP client with configurable politeness (delay between requests) and bounded retries.

use crate::scraper::{FetchError, PageFetcher, Resource};
use std::time::{Duration, Instant};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; seek-scrape/0.1; +https://seekwebserial.wordpress.com)";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DELAY_SECS: u64 = 1;
const MAX_REDIRECTS: usize = 10;

/// Default number of attempts for get_with_retry (initial plus retries).
const DEFAULT_RETRY_COUNT: u32 = 3;
/// Default backoff delays in seconds after each failed attempt.
const DEFAULT_BACKOFF_SECS: [u64; 3] = [1, 2, 4];
/// Backoff for HTTP 429 (rate limit): wait longer so the server can recover.
const BACKOFF_429_SECS: [u64; 4] = [30, 60, 90, 120];

/// Blocking HTTP client that enforces a delay between requests.
#[derive(Debug)]
pub struct PoliteClient {
    inner: reqwest::blocking::Client,
    delay: Duration,
    last_request: Option<Instant>,
    retry_count: u32,
    backoff_secs: Vec<u64>,
}

impl PoliteClient {
    /// Builder for custom User-Agent, delay, timeout, and retries.
    pub fn builder() -> PoliteClientBuilder {
        PoliteClientBuilder::default()
    }

    /// Perform a GET request with retries for transient failures.
    ///
    /// Retries on timeout, connection errors, HTTP 5xx, and HTTP 429. Any other
    /// response (including 4xx) is returned as-is for the caller to inspect.
    pub fn get_with_retry(
        &mut self,
        url: &str,
    ) -> Result<reqwest::blocking::Response, FetchError> {
        let max_attempts = self.retry_count.max(1);
        let mut attempt = 0u32;
        loop {
            self.wait_delay();
            tracing::debug!(url, attempt = attempt + 1, "GET");
            let result = self.inner.get(url).send();
            self.last_request = Some(Instant::now());
            let last_attempt = attempt + 1 >= max_attempts;
            match result {
                Ok(response) => {
                    let status = response.status();
                    let rate_limited = status.as_u16() == 429;
                    if (status.is_server_error() || rate_limited) && !last_attempt {
                        let backoff = if rate_limited {
                            backoff_at(&BACKOFF_429_SECS, attempt, 60)
                        } else {
                            backoff_at(&self.backoff_secs, attempt, 1)
                        };
                        tracing::warn!(
                            url,
                            status = status.as_u16(),
                            backoff_secs = backoff,
                            "transient HTTP status, retrying"
                        );
                        std::thread::sleep(Duration::from_secs(backoff));
                        attempt += 1;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    let retryable = e.is_timeout() || e.is_connect();
                    if retryable && !last_attempt {
                        let backoff = backoff_at(&self.backoff_secs, attempt, 1);
                        tracing::warn!(url, error = %e, backoff_secs = backoff, "request failed, retrying");
                        std::thread::sleep(Duration::from_secs(backoff));
                        attempt += 1;
                        continue;
                    }
                    return Err(FetchError::Network {
                        url: url.to_string(),
                        source: e,
                    });
                }
            }
        }
    }

    /// GET with retries, failing on any non-success status.
    fn get_success(&mut self, url: &str) -> Result<reqwest::blocking::Response, FetchError> {
        let response = self.get_with_retry(url)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    fn wait_delay(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                std::thread::sleep(self.delay - elapsed);
            }
        }
    }
}

/// Backoff for the given 0-based retry; reuses the last entry past the end.
fn backoff_at(schedule: &[u64], attempt: u32, fallback: u64) -> u64 {
    schedule
        .get(attempt as usize)
        .or_else(|| schedule.last())
        .copied()
        .unwrap_or(fallback)
}

impl PageFetcher for PoliteClient {
    fn fetch_page(&mut self, url: &str) -> Result<String, FetchError> {
        let response = self.get_success(url)?;
        response.text().map_err(|e| FetchError::BodyRead {
            url: url.to_string(),
            source: e,
        })
    }

    fn fetch_resource(&mut self, url: &str) -> Result<Resource, FetchError> {
        let response = self.get_success(url)?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = response.bytes().map_err(|e| FetchError::BodyRead {
            url: url.to_string(),
            source: e,
        })?;
        Ok(Resource {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

/// Builder for PoliteClient with optional User-Agent, delay, timeout, and retry settings.
#[derive(Debug)]
pub struct PoliteClientBuilder {
    user_agent: Option<String>,
    delay_secs: u64,
    timeout_secs: u64,
    retry_count: u32,
    retry_backoff_secs: Vec<u64>,
}

impl Default for PoliteClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            delay_secs: DEFAULT_DELAY_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_backoff_secs: DEFAULT_BACKOFF_SECS.to_vec(),
        }
    }
}

impl PoliteClientBuilder {
    /// Set a custom User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set delay between requests in seconds. Default 1.
    pub fn delay_secs(mut self, secs: u64) -> Self {
        self.delay_secs = secs;
        self
    }

    /// Set request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set number of HTTP attempts for transient failures (default 3, minimum 1).
    pub fn retry_count(mut self, n: u32) -> Self {
        self.retry_count = n.max(1);
        self
    }

    /// Set backoff delays in seconds before each retry (e.g. [1, 2]). If shorter than
    /// retry_count - 1, the last value is reused; if empty, exponential 1, 2, 4, ... is used.
    pub fn retry_backoff_secs(mut self, secs: Vec<u64>) -> Self {
        self.retry_backoff_secs = secs;
        self
    }

    pub fn build(self) -> Result<PoliteClient, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        let backoff_secs = if self.retry_backoff_secs.is_empty() {
            let n = self.retry_count.saturating_sub(1) as usize;
            (0..n).map(|i| 1u64 << i.min(4)).collect::<Vec<_>>()
        } else {
            self.retry_backoff_secs
        };
        Ok(PoliteClient {
            inner,
            delay: Duration::from_secs(self.delay_secs),
            last_request: None,
            retry_count: self.retry_count,
            backoff_secs,
        })
    }
}
