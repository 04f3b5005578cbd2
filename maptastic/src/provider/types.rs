//! Provider type definitions

use std::fmt;
use std::time::Duration;

/// HTTP status codes the fetch layer treats specially.
pub mod status {
    pub const OK: u16 = 200;
    pub const NOT_FOUND: u16 = 404;
}

/// A completed HTTP exchange, whatever its status.
///
/// Non-2xx statuses are not errors at this layer; callers decide how to
/// interpret them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Value of the `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// Server-provided `Retry-After` hint, already converted to a delay.
    pub retry_after: Option<Duration>,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with no headers.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            retry_after: None,
            body: body.into(),
        }
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the retry-after hint.
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }
}

/// Errors that can occur while talking to a tile provider.
///
/// Only transport-level failures are errors; an HTTP status is returned as
/// an [`HttpResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Connection, TLS or body read failure.
    HttpError(String),
    /// The request exceeded its connect or read timeout.
    Timeout(String),
    /// The HTTP client could not be constructed.
    ClientBuild(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            ProviderError::Timeout(msg) => write!(f, "Request timed out: {}", msg),
            ProviderError::ClientBuild(msg) => write!(f, "Failed to create HTTP client: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}
