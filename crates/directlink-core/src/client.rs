//! HTTP client with rate limiting and retry logic
//!
//! Provides the reqwest-backed [`Transport`] used for page fetches and
//! confirmation requests.

use reqwest::Url;
use reqwest::cookie::Jar;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{DirectlinkError, Result};
use crate::transport::{FetchRequest, FetchResponse, Transport};
use crate::url::{is_media_extension, media_extension};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Configuration for the HTTP client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Maximum requests per second (default: 2.0)
    pub requests_per_second: f64,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Maximum retry attempts for transient errors (default: 3)
    pub max_retries: u32,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Netscape-format cookie file loaded at construction
    pub cookie_file: Option<PathBuf>,
    /// Maximum redirect hops per request (default: 5)
    pub max_redirects: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2.0,
            timeout_secs: 30,
            max_retries: 3,
            user_agent: USER_AGENT.to_string(),
            cookie_file: None,
            max_redirects: 5,
        }
    }
}

/// Rate limiter to control request frequency
///
/// Ensures requests are spaced at least `min_interval` apart.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Arc<Mutex<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified requests per second
    ///
    /// A non-positive rate disables limiting.
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second > 0.0 && requests_per_second.is_finite() {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };
        let now = Instant::now();
        Self {
            min_interval,
            last_request: Arc::new(Mutex::new(now.checked_sub(min_interval).unwrap_or(now))),
        }
    }

    /// Acquire permission to make a request
    ///
    /// If called before the minimum interval has passed since the last request,
    /// this method will sleep until the interval has elapsed.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();

        if elapsed < self.min_interval {
            let wait_time = self.min_interval - elapsed;
            sleep(wait_time).await;
        }

        *last = Instant::now();
    }

    /// Get the minimum interval between requests
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Parses a Netscape cookie file into a cookie jar
///
/// Lines are `domain, include_subdomains, path, secure, expiry, name, value`
/// separated by tabs. Comments and blank lines are skipped; the
/// `#HttpOnly_` domain prefix is honored.
pub fn load_cookie_file(path: &Path) -> Result<Jar> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        DirectlinkError::Config(format!("cannot read cookie file {}: {}", path.display(), e))
    })?;

    let jar = Jar::default();
    let mut loaded = 0usize;

    for line in content.lines() {
        let line = line.trim_end_matches('\r');
        let line = match line.strip_prefix("#HttpOnly_") {
            Some(rest) => rest,
            None if line.starts_with('#') || line.trim().is_empty() => continue,
            None => line,
        };

        let fields: Vec<&str> = line.split('\t').collect();
        let [domain, _, path, secure, _, name, value] = fields[..] else {
            debug!(line, "skipping malformed cookie line");
            continue;
        };

        let host = domain.trim_start_matches('.');
        let Ok(url) = Url::parse(&format!("https://{}{}", host, path)) else {
            continue;
        };

        let mut cookie = format!("{}={}; Domain={}; Path={}", name, value, domain, path);
        if secure.eq_ignore_ascii_case("TRUE") {
            cookie.push_str("; Secure");
        }
        jar.add_cookie_str(&cookie, &url);
        loaded += 1;
    }

    debug!(path = %path.display(), cookies = loaded, "cookie file loaded");
    Ok(jar)
}

/// Whether a response body is worth reading as text
fn is_textual(content_type: Option<&str>, final_url: &str) -> bool {
    match content_type {
        Some(ct) => {
            ct.starts_with("text/")
                || ct.contains("json")
                || ct.contains("xml")
                || ct.contains("javascript")
        }
        None => !media_extension(final_url).is_some_and(|ext| is_media_extension(&ext)),
    }
}

/// HTTP client wrapper with rate limiting and retry logic
///
/// Handles all HTTP communication, including:
/// - Rate limiting to avoid overwhelming the server
/// - Automatic retries with exponential backoff for transient errors
/// - Manual redirect following that records the final URL
/// - Browser-like headers and an optional cookie file
pub struct MediaClient {
    client: reqwest::Client,
    rate_limiter: RateLimiter,
    max_retries: u32,
    max_redirects: u32,
}

impl MediaClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    ///
    /// # Errors
    /// - `Config` - The cookie file cannot be read
    /// - `HttpError` - The underlying client cannot be built
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::none())
            .default_headers(headers);

        builder = match &config.cookie_file {
            Some(path) => builder.cookie_provider(Arc::new(load_cookie_file(path)?)),
            None => builder.cookie_store(true),
        };

        let client = builder.build().map_err(DirectlinkError::HttpError)?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(config.requests_per_second),
            max_retries: config.max_retries,
            max_redirects: config.max_redirects,
        })
    }

    /// Internal method to fetch with retry logic
    ///
    /// Retries timeouts, connection errors, 429 and 5xx with backoff of
    /// 1s, 2s, 4s... A retryable status that survives every attempt is
    /// returned as a normal response.
    async fn fetch_with_retry(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let mut attempt = 0;

        loop {
            self.rate_limiter.acquire().await;

            let outcome = self.do_fetch(request).await;
            let retryable = match &outcome {
                Ok(response) => Self::is_retryable_status(response.status),
                Err(e) => Self::is_retryable(e),
            };

            if !retryable || attempt >= self.max_retries {
                return outcome;
            }

            // Exponential backoff: 1s, 2s, 4s
            let backoff = Duration::from_secs(1 << attempt.min(6));
            debug!(url = %request.url, attempt, ?backoff, "retrying request");
            sleep(backoff).await;
            attempt += 1;
        }
    }

    /// Perform a single fetch attempt with manual redirect following
    async fn do_fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let mut current_url = request.url.clone();
        let mut last_status = 0;

        for _ in 0..=self.max_redirects {
            let mut builder = self.client.get(&current_url).timeout(request.timeout);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    DirectlinkError::Timeout(request.timeout.as_secs())
                } else {
                    DirectlinkError::HttpError(e)
                }
            })?;
            let status = response.status();
            last_status = status.as_u16();

            // Handle redirects manually to keep track of the final URL
            if status.is_redirection()
                && let Some(location) = response.headers().get(header::LOCATION)
                && let Ok(location) = location.to_str()
            {
                let base = Url::parse(&current_url)
                    .map_err(|_| DirectlinkError::InvalidUrl(current_url.clone()))?;
                let next = base
                    .join(location)
                    .map_err(|_| DirectlinkError::InvalidUrl(location.to_string()))?;
                debug!(from = %current_url, to = %next, status = last_status, "following redirect");
                current_url = next.to_string();
                continue;
            }

            let headers: Vec<(String, String)> = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();

            let content_type = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_ascii_lowercase());

            let body = if is_textual(content_type.as_deref(), &current_url) {
                response.text().await.map_err(DirectlinkError::HttpError)?
            } else {
                String::new()
            };

            return Ok(FetchResponse {
                status: last_status,
                body,
                final_url: current_url,
                headers,
            });
        }

        Err(DirectlinkError::Transport {
            status: last_status,
            url: current_url,
        })
    }

    fn is_retryable_status(status: u16) -> bool {
        status == 429 || (500..600).contains(&status)
    }

    /// Check if an error is retryable
    fn is_retryable(error: &DirectlinkError) -> bool {
        match error {
            DirectlinkError::Timeout(_) => true,
            DirectlinkError::HttpError(e) => {
                // Retry on timeout, connection errors, or 5xx status codes
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            _ => false,
        }
    }

    /// Get a reference to the rate limiter (for testing)
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}

impl Transport for MediaClient {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        self.fetch_with_retry(&request).await
    }
}
