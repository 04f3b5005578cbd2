//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use maptastic::config::{ConfigFileError, ConfigurationError};
use maptastic::coord::CoordError;
use maptastic::engine::EngineError;
use maptastic::provider::ProviderError;

/// Exit code for a download that did not converge or a failed verification.
pub const EXIT_FAILURE: i32 = 1;

/// Exit code for invalid configuration or arguments.
pub const EXIT_CONFIG: i32 = 2;

/// Exit code after Ctrl-C (128 + SIGINT).
pub const EXIT_CANCELLED: i32 = 130;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Config file could not be read or holds an invalid value
    ConfigFile(ConfigFileError),
    /// Credential or output directory unusable
    Configuration(ConfigurationError),
    /// Region or zoom arguments rejected
    InvalidInput(CoordError),
    /// HTTP client could not be built
    Provider(ProviderError),
    /// Engine could not be built
    Engine(EngineError),
    /// Tiles remained unresolved after all retries
    DownloadFailed { unresolved: usize },
    /// Verification found missing or empty tiles
    VerifyFailed { missing: usize, zero: usize },
    /// Interrupted by the user
    Cancelled,
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::DownloadFailed { .. } | CliError::VerifyFailed { .. } => EXIT_FAILURE,
            CliError::Cancelled => EXIT_CANCELLED,
            _ => EXIT_CONFIG,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Configuration(ConfigurationError::MissingApiKey) => {
                eprintln!();
                eprintln!("Get a key at https://manage.thunderforest.com and either:");
                eprintln!("  1. Set api_key under [provider] in ~/.maptastic/config.ini");
                eprintln!("  2. Pass --api-key");
                eprintln!("  3. Export MAPTASTIC_API_KEY");
            }
            CliError::DownloadFailed { .. } => {
                eprintln!();
                eprintln!("Tiles already downloaded are kept. Re-run the same command to");
                eprintln!("retry only the missing ones.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Configuration(e) => write!(f, "{}", e),
            CliError::InvalidInput(e) => write!(f, "{}", e),
            CliError::Provider(e) => write!(f, "{}", e),
            CliError::Engine(e) => write!(f, "Failed to start download engine: {}", e),
            CliError::DownloadFailed { unresolved } => write!(
                f,
                "Download failed: {} tiles remain missing or zero-byte",
                unresolved
            ),
            CliError::VerifyFailed { missing, zero } => write!(
                f,
                "Verification failed: {} missing, {} zero-byte tiles",
                missing, zero
            ),
            CliError::Cancelled => write!(f, "Download cancelled"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Configuration(e) => Some(e),
            CliError::InvalidInput(e) => Some(e),
            CliError::Provider(e) => Some(e),
            CliError::Engine(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<ConfigurationError> for CliError {
    fn from(e: ConfigurationError) -> Self {
        CliError::Configuration(e)
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::InvalidInput(e)
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Provider(e)
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        CliError::Engine(e)
    }
}
