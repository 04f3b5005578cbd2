//! Common types and utilities shared across CLI commands.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use maptastic::codec::Quality;
use maptastic::config::{ApiKey, ConfigFile, ConfigurationError, API_KEY_ENV};
use maptastic::coord::{Region, ZoomRange};

use crate::error::CliError;

/// Output quality selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum QualityLevel {
    /// Quantize tiles from zoom 8 (smallest files)
    Low,
    /// Quantize tiles from zoom 12
    Medium,
    /// Keep full colour at every realistic zoom
    High,
}

impl From<QualityLevel> for Quality {
    fn from(level: QualityLevel) -> Self {
        match level {
            QualityLevel::Low => Quality::Low,
            QualityLevel::Medium => Quality::Medium,
            QualityLevel::High => Quality::High,
        }
    }
}

/// Region, zoom and storage arguments shared by `download` and `verify`.
#[derive(Debug, Clone, Args)]
pub struct TileSetArgs {
    /// Bounding box as maxLat,minLon,minLat,maxLon
    #[arg(long, allow_hyphen_values = true)]
    pub region: Region,

    /// First zoom level (0-22)
    #[arg(long)]
    pub zoom_start: u8,

    /// Last zoom level, inclusive (0-22)
    #[arg(long)]
    pub zoom_end: u8,

    /// Output directory (defaults to [download] output in config.ini)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Map style (defaults to [provider] style in config.ini)
    #[arg(long)]
    pub style: Option<String>,
}

impl TileSetArgs {
    pub fn zoom_range(&self) -> Result<ZoomRange, CliError> {
        Ok(ZoomRange::new(self.zoom_start, self.zoom_end)?)
    }

    /// Overlay these arguments on the loaded configuration.
    pub fn apply(&self, config: &mut ConfigFile) {
        if let Some(output) = &self.output {
            config.download.output = Some(output.clone());
        }
        if let Some(style) = &self.style {
            config.provider.style = style.clone();
        }
    }
}

/// Load the config file from `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            ConfigFile::load_from(path)?
        }
        None => ConfigFile::load()?,
    };
    Ok(config)
}

/// Resolve the API key: CLI flag, then config file, then environment.
pub fn resolve_api_key(cli_key: Option<&str>, config: &ConfigFile) -> Result<ApiKey, CliError> {
    let env_key = env::var(API_KEY_ENV).ok();
    let key = cli_key
        .or(config.provider.api_key.as_deref())
        .or(env_key.as_deref())
        .unwrap_or("");
    Ok(ApiKey::new(key)?)
}

/// Create the output directory if needed.
pub fn prepare_output(path: &Path) -> Result<PathBuf, CliError> {
    if path.exists() && !path.is_dir() {
        return Err(ConfigurationError::InvalidOutput {
            path: path.to_path_buf(),
            reason: "exists and is not a directory".to_string(),
        }
        .into());
    }

    fs::create_dir_all(path).map_err(|e| ConfigurationError::InvalidOutput {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(path.to_path_buf())
}
