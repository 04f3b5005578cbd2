//! Tile URL construction.
//!
//! Tile services following the Thunderforest convention serve
//! `GET <base>/<style>/<z>/<x>/<y>.png?apikey=<key>`.

use crate::config::ApiKey;
use crate::coord::TileCoord;

/// Default tile service base URL.
pub const DEFAULT_BASE_URL: &str = "https://tile.thunderforest.com";

/// Default provider name, used as the first directory level on disk.
pub const DEFAULT_PROVIDER: &str = "thunderforest";

/// Default map style.
pub const DEFAULT_STYLE: &str = "atlas";

/// A templated raster tile endpoint.
#[derive(Debug, Clone)]
pub struct TileEndpoint {
    base_url: String,
    style: String,
    api_key: ApiKey,
}

impl TileEndpoint {
    pub fn new(base_url: impl Into<String>, style: impl Into<String>, api_key: ApiKey) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            style: style.into(),
            api_key,
        }
    }

    /// Endpoint on the default base URL.
    pub fn thunderforest(style: impl Into<String>, api_key: ApiKey) -> Self {
        Self::new(DEFAULT_BASE_URL, style, api_key)
    }

    /// Full request URL, including the credential.
    pub fn url_for(&self, coord: &TileCoord) -> String {
        format!(
            "{}/{}/{}/{}/{}.png?apikey={}",
            self.base_url,
            self.style,
            coord.zoom,
            coord.x,
            coord.y,
            self.api_key.expose()
        )
    }

    /// URL safe for logs: the credential is masked.
    pub fn redacted_url_for(&self, coord: &TileCoord) -> String {
        format!(
            "{}/{}/{}/{}/{}.png?apikey=***",
            self.base_url, self.style, coord.zoom, coord.x, coord.y
        )
    }
}
