//! HTTP client abstraction for testability

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE, RETRY_AFTER};

use super::types::{HttpResponse, ProviderError};

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 20;

/// Default read timeout in seconds.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 40;

/// Default idle connections kept per host.
///
/// Should be at least the worker count so workers never queue on the pool.
pub const DEFAULT_POOL_SIZE: usize = 128;

const USER_AGENT: &str = concat!(
    "Maptastic/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/maptastic/maptastic)"
);

const ACCEPT_IMAGES: &str = "image/png,image/*;q=0.8,*/*;q=0.5";

/// Trait for HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests. Implementations are shared by
/// every download worker and must be safe for concurrent use.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// Returns the response for any status code; `Err` means the exchange
    /// itself failed (connect, timeout, body read).
    fn get(&self, url: &str) -> Result<HttpResponse, ProviderError>;
}

impl<C: HttpClient + ?Sized> HttpClient for std::sync::Arc<C> {
    fn get(&self, url: &str) -> Result<HttpResponse, ProviderError> {
        (**self).get(url)
    }
}

/// Connection settings for [`ReqwestClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,
    /// Time allowed to receive the response once connected.
    pub read_timeout: Duration,
    /// Idle connections kept alive per host.
    pub pool_size: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

/// Real HTTP client implementation using reqwest.
///
/// Wraps a single pooled blocking client; clones of the underlying client
/// share the same pool.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with the given connection settings.
    pub fn new(settings: &HttpSettings) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_IMAGES));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.connect_timeout + settings.read_timeout)
            .pool_max_idle_per_host(settings.pool_size)
            .build()
            .map_err(|e| ProviderError::ClientBuild(e.to_string()))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<HttpResponse, ProviderError> {
        let response = self.client.get(url).send().map_err(|e| {
            // Strip the URL: it carries the API key
            let e = e.without_url();
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::HttpError(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()));

        let body = response.bytes().map_err(|e| {
            let e = e.without_url();
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::HttpError(format!("Failed to read response: {}", e))
            }
        })?;

        Ok(HttpResponse {
            status,
            content_type,
            retry_after,
            body: body.to_vec(),
        })
    }
}

/// Parses a `Retry-After` header value.
///
/// Accepts delta-seconds (`"120"`) or an HTTP-date
/// (`"Wed, 21 Oct 2015 07:28:00 GMT"`). Dates in the past yield a zero delay.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = at.with_timezone(&Utc) - now;
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}
