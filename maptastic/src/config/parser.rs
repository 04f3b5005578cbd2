//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Largest accepted `[request] backoff_factor`, in seconds. Matches the
/// per-retry delay cap, so larger factors could never take effect.
const MAX_BACKOFF_FACTOR_SECS: f64 = 120.0;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [provider] section
    if let Some(section) = ini.section(Some("provider")) {
        if let Some(v) = non_empty(section, "api_key") {
            config.provider.api_key = Some(v.to_string());
        }
        if let Some(v) = non_empty(section, "name") {
            config.provider.name = v.to_string();
        }
        if let Some(v) = non_empty(section, "style") {
            config.provider.style = v.to_string();
        }
        if let Some(v) = non_empty(section, "base_url") {
            if !(v.starts_with("http://") || v.starts_with("https://")) {
                return Err(invalid(
                    "provider",
                    "base_url",
                    v,
                    "must start with http:// or https://",
                ));
            }
            config.provider.base_url = v.to_string();
        }
    }

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = section.get("workers") {
            config.download.workers =
                parse_positive("download", "workers", v, "must be a positive integer")?;
        }
        if let Some(v) = section.get("max_retries") {
            config.download.max_retries = parse_number(
                "download",
                "max_retries",
                v,
                "must be a non-negative integer",
            )?;
        }
        if let Some(v) = section.get("connect_timeout") {
            config.download.connect_timeout = parse_positive(
                "download",
                "connect_timeout",
                v,
                "must be a positive integer (seconds)",
            )?;
        }
        if let Some(v) = section.get("read_timeout") {
            config.download.read_timeout = parse_positive(
                "download",
                "read_timeout",
                v,
                "must be a positive integer (seconds)",
            )?;
        }
        if let Some(v) = section.get("pool_size") {
            config.download.pool_size = parse_number(
                "download",
                "pool_size",
                v,
                "must be a non-negative integer",
            )?;
        }
        if let Some(v) = section.get("quality") {
            config.download.quality = v.parse().map_err(|_| {
                invalid("download", "quality", v, "must be one of: low, medium, high")
            })?;
        }
        if let Some(v) = non_empty(section, "output") {
            config.download.output = Some(expand_tilde(v));
        }
    }

    // [request] section
    if let Some(section) = ini.section(Some("request")) {
        if let Some(v) = section.get("max_retries") {
            config.request.max_retries = parse_number(
                "request",
                "max_retries",
                v,
                "must be a non-negative integer",
            )?;
        }
        if let Some(v) = section.get("backoff_factor") {
            let reason = "must be a number of seconds between 0 and 120";
            let factor: f64 = parse_number("request", "backoff_factor", v, reason)?;
            if !(0.0..=MAX_BACKOFF_FACTOR_SECS).contains(&factor) {
                return Err(invalid("request", "backoff_factor", v, reason));
            }
            config.request.backoff_factor = factor;
        }
    }

    Ok(config)
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

/// Parse a number that must be greater than zero.
fn parse_positive<T: FromStr + Default + PartialEq>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    let parsed: T = parse_number(section, key, value, reason)?;
    if parsed == T::default() {
        return Err(invalid(section, key, value, reason));
    }
    Ok(parsed)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Quality;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(content).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_empty_ini_gives_defaults() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
[provider]
api_key = abcdefghijklmnopqrstuvwxyz
name = tf
style = cycle
base_url = http://localhost:9000/

[download]
workers = 8
max_retries = 3
connect_timeout = 5
read_timeout = 10
pool_size = 16
quality = low
output = /srv/tiles

[request]
max_retries = 2
backoff_factor = 0.1
"#,
        )
        .unwrap();

        assert_eq!(
            config.provider.api_key.as_deref(),
            Some("abcdefghijklmnopqrstuvwxyz")
        );
        assert_eq!(config.provider.name, "tf");
        assert_eq!(config.provider.style, "cycle");
        assert_eq!(config.provider.base_url, "http://localhost:9000/");
        assert_eq!(config.download.workers, 8);
        assert_eq!(config.download.max_retries, 3);
        assert_eq!(config.download.connect_timeout, 5);
        assert_eq!(config.download.read_timeout, 10);
        assert_eq!(config.download.pool_size, 16);
        assert_eq!(config.download.quality, Quality::Low);
        assert_eq!(config.download.output, Some(PathBuf::from("/srv/tiles")));
        assert_eq!(config.request.max_retries, 2);
        assert_eq!(config.request.backoff_factor, 0.1);
    }

    #[test]
    fn test_blank_api_key_is_unset() {
        let config = parse("[provider]\napi_key =   \n").unwrap();
        assert!(config.provider.api_key.is_none());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = parse("[download]\nworkers = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::InvalidValue { ref key, .. } if key == "workers"
        ));
    }

    #[test]
    fn test_bad_quality_rejected() {
        let err = parse("[download]\nquality = ultra\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: download.quality = 'ultra' - must be one of: low, medium, high"
        );
    }

    #[test]
    fn test_non_numeric_timeout_rejected() {
        assert!(parse("[download]\nread_timeout = soon\n").is_err());
    }

    #[test]
    fn test_negative_backoff_rejected() {
        assert!(parse("[request]\nbackoff_factor = -1\n").is_err());
    }

    #[test]
    fn test_huge_backoff_rejected() {
        for value in ["1e300", "inf", "NaN", "121"] {
            let err = parse(&format!("[request]\nbackoff_factor = {}\n", value)).unwrap_err();
            assert!(matches!(
                err,
                ConfigFileError::InvalidValue { ref key, .. } if key == "backoff_factor"
            ));
        }
        let config = parse("[request]\nbackoff_factor = 120\n").unwrap();
        assert_eq!(
            config.request_retry_policy().backoff_factor,
            std::time::Duration::from_secs(120)
        );
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        for key in ["connect_timeout", "read_timeout"] {
            let err = parse(&format!("[download]\n{} = 0\n", key)).unwrap_err();
            assert!(matches!(
                err,
                ConfigFileError::InvalidValue { key: ref k, .. } if k == key
            ));
        }
    }

    #[test]
    fn test_bad_base_url_rejected() {
        assert!(parse("[provider]\nbase_url = ftp://tiles\n").is_err());
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/maps"), home.join("maps"));
        }
    }
}
