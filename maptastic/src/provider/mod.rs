//! Tile imagery provider access
//!
//! This module provides the HTTP plumbing used to fetch raster tiles:
//! a mockable [`HttpClient`] trait, a pooled reqwest implementation, a
//! request-level retry decorator, and the tile URL template.
//!
//! # Example
//!
//! ```ignore
//! use maptastic::provider::{HttpSettings, ReqwestClient, RequestRetryPolicy, RetryingClient};
//!
//! let client = RetryingClient::new(
//!     ReqwestClient::new(&HttpSettings::default())?,
//!     RequestRetryPolicy::default(),
//! );
//! ```

mod endpoint;
mod http;
mod retry;
mod types;

pub use endpoint::{TileEndpoint, DEFAULT_BASE_URL, DEFAULT_PROVIDER, DEFAULT_STYLE};
pub use http::{
    parse_retry_after, HttpClient, HttpSettings, ReqwestClient, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_POOL_SIZE, DEFAULT_READ_TIMEOUT_SECS,
};
pub use retry::{
    RequestRetryPolicy, RetryingClient, DEFAULT_BACKOFF_FACTOR, DEFAULT_MAX_BACKOFF,
    DEFAULT_REQUEST_RETRIES, DEFAULT_RETRYABLE_STATUSES, DEFAULT_TRANSPORT_RETRIES,
};
pub use types::{status, HttpResponse, ProviderError};

#[cfg(test)]
pub use http::tests::{MockHttpClient, ScriptedHttpClient};
