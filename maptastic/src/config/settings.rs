//! Configuration settings structs and their defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::codec::Quality;
use crate::engine::{
    BatchRetryPolicy, EngineConfig, DEFAULT_BATCH_RETRIES, DEFAULT_UNRESOLVED_LOG_LIMIT,
    DEFAULT_WORKERS,
};
use crate::provider::{
    HttpSettings, RequestRetryPolicy, DEFAULT_BACKOFF_FACTOR, DEFAULT_BASE_URL,
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MAX_BACKOFF, DEFAULT_POOL_SIZE, DEFAULT_PROVIDER,
    DEFAULT_READ_TIMEOUT_SECS, DEFAULT_REQUEST_RETRIES, DEFAULT_STYLE,
};
use crate::store::TileLayout;

use super::api_key::{ApiKey, ConfigurationError};

/// Complete configuration, as read from `config.ini`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub provider: ProviderSettings,
    pub download: DownloadSettings,
    pub request: RequestSettings,
}

/// `[provider]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    /// Raw key; validated by [`ConfigFile::api_key`].
    pub api_key: Option<String>,
    /// First directory level under the output root.
    pub name: String,
    pub style: String,
    pub base_url: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            name: DEFAULT_PROVIDER.to_string(),
            style: DEFAULT_STYLE.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSettings {
    pub workers: usize,
    /// Batch-level retry ceiling.
    pub max_retries: u32,
    /// Seconds.
    pub connect_timeout: u64,
    /// Seconds.
    pub read_timeout: u64,
    pub pool_size: usize,
    pub quality: Quality,
    pub output: Option<PathBuf>,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_retries: DEFAULT_BATCH_RETRIES,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout: DEFAULT_READ_TIMEOUT_SECS,
            pool_size: DEFAULT_POOL_SIZE,
            quality: Quality::default(),
            output: None,
        }
    }
}

/// `[request]` section: the per-request retry layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSettings {
    pub max_retries: u32,
    /// Seconds; the n-th retry waits `backoff_factor * 2^(n-1)`.
    pub backoff_factor: f64,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_REQUEST_RETRIES,
            backoff_factor: DEFAULT_BACKOFF_FACTOR.as_secs_f64(),
        }
    }
}

impl ConfigFile {
    /// Validated API key.
    pub fn api_key(&self) -> Result<ApiKey, ConfigurationError> {
        ApiKey::new(self.provider.api_key.as_deref().unwrap_or(""))
    }

    /// Output root, required for any download or verification.
    pub fn output_dir(&self) -> Result<&PathBuf, ConfigurationError> {
        self.download
            .output
            .as_ref()
            .ok_or(ConfigurationError::MissingOutput)
    }

    pub fn layout(&self) -> Result<TileLayout, ConfigurationError> {
        Ok(TileLayout::new(
            self.output_dir()?,
            &self.provider.name,
            &self.provider.style,
        ))
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            connect_timeout: Duration::from_secs(self.download.connect_timeout),
            read_timeout: Duration::from_secs(self.download.read_timeout),
            pool_size: self.download.pool_size,
        }
    }

    pub fn request_retry_policy(&self) -> RequestRetryPolicy {
        // Unrepresentable factors set directly on the struct fall back to the default
        let factor = Duration::try_from_secs_f64(self.request.backoff_factor)
            .map(|d| d.min(DEFAULT_MAX_BACKOFF))
            .unwrap_or(DEFAULT_BACKOFF_FACTOR);
        let policy = RequestRetryPolicy::default()
            .with_max_retries(self.request.max_retries)
            .with_backoff_factor(factor);
        RequestRetryPolicy {
            max_transport_retries: policy.max_transport_retries.min(policy.max_retries),
            ..policy
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            workers: self.download.workers,
            retry: BatchRetryPolicy {
                max_retries: self.download.max_retries,
                ..BatchRetryPolicy::default()
            },
            unresolved_log_limit: DEFAULT_UNRESOLVED_LOG_LIMIT,
            ..EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConfigFile::default();
        assert_eq!(config.provider.name, "thunderforest");
        assert_eq!(config.provider.style, "atlas");
        assert!(config.provider.api_key.is_none());
        assert_eq!(config.download.workers, 96);
        assert_eq!(config.download.max_retries, 50);
        assert_eq!(config.download.quality, Quality::Medium);
        assert_eq!(config.request.max_retries, 8);
        assert!(config.download.output.is_none());
    }

    #[test]
    fn test_missing_key_and_output() {
        let config = ConfigFile::default();
        assert_eq!(config.api_key(), Err(ConfigurationError::MissingApiKey));
        assert_eq!(config.output_dir(), Err(ConfigurationError::MissingOutput));
    }

    #[test]
    fn test_http_settings_conversion() {
        let mut config = ConfigFile::default();
        config.download.connect_timeout = 5;
        config.download.read_timeout = 7;
        config.download.pool_size = 16;

        let http = config.http_settings();
        assert_eq!(http.connect_timeout, Duration::from_secs(5));
        assert_eq!(http.read_timeout, Duration::from_secs(7));
        assert_eq!(http.pool_size, 16);
    }

    #[test]
    fn test_request_policy_conversion() {
        let mut config = ConfigFile::default();
        config.request.max_retries = 3;
        config.request.backoff_factor = 0.25;

        let policy = config.request_retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.max_transport_retries, 3);
        assert_eq!(policy.backoff_factor, Duration::from_millis(250));
    }

    #[test]
    fn test_request_policy_survives_unrepresentable_factor() {
        let mut config = ConfigFile::default();
        config.request.backoff_factor = 1e300;
        assert_eq!(config.request_retry_policy().backoff_factor, DEFAULT_BACKOFF_FACTOR);

        config.request.backoff_factor = f64::NAN;
        assert_eq!(config.request_retry_policy().backoff_factor, DEFAULT_BACKOFF_FACTOR);

        config.request.backoff_factor = 500.0;
        assert_eq!(config.request_retry_policy().backoff_factor, DEFAULT_MAX_BACKOFF);
    }

    #[test]
    fn test_engine_config_conversion() {
        let mut config = ConfigFile::default();
        config.download.workers = 4;
        config.download.max_retries = 2;

        let engine = config.engine_config();
        assert_eq!(engine.workers, 4);
        assert_eq!(engine.retry.max_retries, 2);
        assert!(engine.skip_permanent_misses);
    }

    #[test]
    fn test_layout_uses_provider_and_style() {
        let mut config = ConfigFile::default();
        config.download.output = Some(PathBuf::from("/tiles"));
        config.provider.style = "cycle".to_string();

        let layout = config.layout().unwrap();
        assert_eq!(
            layout.tile_path(&crate::coord::TileCoord::new(3, 1, 2)),
            PathBuf::from("/tiles/thunderforest/cycle/3/1/2.png")
        );
    }
}
