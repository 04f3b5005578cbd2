//! User configuration.
//!
//! Settings are read from `~/.maptastic/config.ini` and overlaid on
//! defaults. A missing file is not an error.
//!
//! ```ini
//! [provider]
//! api_key = your-thunderforest-key
//! style = atlas
//!
//! [download]
//! workers = 96
//! max_retries = 50
//! quality = medium
//! output = ~/maps
//!
//! [request]
//! max_retries = 8
//! backoff_factor = 0.5
//! ```

mod api_key;
mod file;
mod parser;
mod settings;

pub use api_key::{ApiKey, ConfigurationError, API_KEY_ENV, MIN_API_KEY_LEN};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{ConfigFile, DownloadSettings, ProviderSettings, RequestSettings};
