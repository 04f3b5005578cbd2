//! Tile service credential and configuration validation errors.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Shortest key accepted as plausible.
pub const MIN_API_KEY_LEN: usize = 20;

/// Environment variable consulted when no key is configured.
pub const API_KEY_ENV: &str = "MAPTASTIC_API_KEY";

/// Errors that make a run impossible before any network call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// No API key was supplied.
    #[error("No API key configured (set [provider] api_key, --api-key or MAPTASTIC_API_KEY)")]
    MissingApiKey,

    /// The API key is implausibly short.
    #[error("API key is too short ({length} characters, at least {minimum} required)")]
    ApiKeyTooShort { length: usize, minimum: usize },

    /// No output directory was supplied.
    #[error("No output directory configured (set [download] output or --output)")]
    MissingOutput,

    /// The output directory cannot be used.
    #[error("Invalid output directory {}: {reason}", .path.display())]
    InvalidOutput { path: PathBuf, reason: String },
}

/// A validated tile service API key.
///
/// `Debug` never prints the key itself.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Validate a key: surrounding whitespace is ignored, the rest must be
    /// at least [`MIN_API_KEY_LEN`] characters.
    pub fn new(key: &str) -> Result<Self, ConfigurationError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigurationError::MissingApiKey);
        }
        let length = key.chars().count();
        if length < MIN_API_KEY_LEN {
            return Err(ConfigurationError::ApiKeyTooShort {
                length,
                minimum: MIN_API_KEY_LEN,
            });
        }
        Ok(Self(key.to_string()))
    }

    /// The raw key, for building request URLs only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}
