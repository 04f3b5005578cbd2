//! Single-tile download.
//!
//! [`TileFetcher`] performs one GET for one tile, classifies the response
//! and hands successful bodies to the codec. It has no idempotence guard of
//! its own: the engine only dispatches tiles that verification reported as
//! missing or corrupt.

use std::fmt;

use tracing::{debug, warn};

use crate::codec::TileCodec;
use crate::coord::TileCoord;
use crate::provider::{status, HttpClient, TileEndpoint};
use crate::store::TileStore;

/// Result of one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Tile written to disk.
    Success,
    /// The service does not have this tile (HTTP 404).
    PermanentMiss(String),
    /// Anything that may succeed on a later attempt.
    TransientFailure(String),
}

impl DownloadOutcome {
    pub fn is_permanent_miss(&self) -> bool {
        matches!(self, DownloadOutcome::PermanentMiss(_))
    }
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadOutcome::Success => write!(f, "success"),
            DownloadOutcome::PermanentMiss(reason) => write!(f, "permanent miss: {}", reason),
            DownloadOutcome::TransientFailure(reason) => {
                write!(f, "transient failure: {}", reason)
            }
        }
    }
}

/// Fetches tiles from an endpoint and persists them into a store.
///
/// Shared by all download workers; `C` must be usable concurrently.
pub struct TileFetcher<C: HttpClient> {
    client: C,
    endpoint: TileEndpoint,
    store: TileStore,
    codec: TileCodec,
}

impl<C: HttpClient> TileFetcher<C> {
    pub fn new(client: C, endpoint: TileEndpoint, store: TileStore, codec: TileCodec) -> Self {
        Self {
            client,
            endpoint,
            store,
            codec,
        }
    }

    pub fn store(&self) -> &TileStore {
        &self.store
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Download one tile and write it to its store path.
    pub fn fetch(&self, coord: &TileCoord) -> DownloadOutcome {
        let url = self.endpoint.url_for(coord);
        let log_url = self.endpoint.redacted_url_for(coord);

        let response = match self.client.get(&url) {
            Ok(response) => response,
            Err(e) => {
                debug!(tile = %coord, url = %log_url, error = %e, "Tile request failed");
                return DownloadOutcome::TransientFailure(e.to_string());
            }
        };

        match response.status {
            status::OK if response.body.is_empty() => {
                debug!(tile = %coord, url = %log_url, "Empty tile body");
                DownloadOutcome::TransientFailure("empty response body".to_string())
            }
            status::OK => {
                let path = match self.store.ensure_parent(coord) {
                    Ok(path) => path,
                    Err(e) => {
                        warn!(tile = %coord, error = %e, "Cannot prepare tile directory");
                        return DownloadOutcome::TransientFailure(e.to_string());
                    }
                };

                match self.codec.persist(
                    &response.body,
                    &path,
                    response.content_type.as_deref(),
                    coord.zoom,
                ) {
                    Ok(mode) => {
                        debug!(tile = %coord, mode = ?mode, bytes = response.body.len(), "Tile saved");
                        DownloadOutcome::Success
                    }
                    Err(e) => {
                        warn!(tile = %coord, error = %e, "Failed to persist tile");
                        DownloadOutcome::TransientFailure(e.to_string())
                    }
                }
            }
            status::NOT_FOUND => {
                warn!(tile = %coord, url = %log_url, "Tile not found (HTTP 404)");
                DownloadOutcome::PermanentMiss("HTTP 404".to_string())
            }
            other => {
                debug!(tile = %coord, url = %log_url, status = other, "Unexpected tile status");
                DownloadOutcome::TransientFailure(format!("HTTP {}", other))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKey;
    use crate::provider::{HttpResponse, MockHttpClient, ProviderError};
    use crate::store::{TileLayout, TileStatus};
    use tempfile::TempDir;

    const KEY: &str = "0123456789abcdef0123456789";

    fn fetcher(dir: &TempDir, mock: MockHttpClient) -> TileFetcher<MockHttpClient> {
        let endpoint = TileEndpoint::new(
            "http://tiles.test",
            "atlas",
            ApiKey::new(KEY).unwrap(),
        );
        let store = TileStore::new(TileLayout::new(dir.path(), "thunderforest", "atlas"));
        TileFetcher::new(mock, endpoint, store, TileCodec::new(100))
    }

    fn png_ok(body: &[u8]) -> Result<HttpResponse, ProviderError> {
        Ok(HttpResponse::new(200, body.to_vec()).with_content_type("image/png"))
    }

    #[test]
    fn test_success_writes_tile() {
        let dir = TempDir::new().unwrap();
        let f = fetcher(&dir, MockHttpClient::new(png_ok(b"0123456789")));
        let coord = TileCoord::new(3, 2, 5);

        assert_eq!(f.fetch(&coord), DownloadOutcome::Success);

        let path = dir.path().join("thunderforest/atlas/3/2/5.png");
        assert_eq!(std::fs::read(path).unwrap(), b"0123456789");
        assert_eq!(f.store().status_of(&coord), TileStatus::Ok);
    }

    #[test]
    fn test_not_found_is_permanent_miss() {
        let dir = TempDir::new().unwrap();
        let f = fetcher(&dir, MockHttpClient::new(Ok(HttpResponse::new(404, Vec::new()))));

        let outcome = f.fetch(&TileCoord::new(1, 0, 0));
        assert!(outcome.is_permanent_miss());
        assert_eq!(
            f.store().status_of(&TileCoord::new(1, 0, 0)),
            TileStatus::Missing
        );
    }

    #[test]
    fn test_empty_body_is_transient() {
        let dir = TempDir::new().unwrap();
        let f = fetcher(&dir, MockHttpClient::new(png_ok(b"")));

        assert!(matches!(
            f.fetch(&TileCoord::new(1, 0, 0)),
            DownloadOutcome::TransientFailure(_)
        ));
    }

    #[test]
    fn test_server_error_is_transient() {
        let dir = TempDir::new().unwrap();
        let f = fetcher(&dir, MockHttpClient::new(Ok(HttpResponse::new(503, Vec::new()))));

        assert_eq!(
            f.fetch(&TileCoord::new(1, 0, 0)),
            DownloadOutcome::TransientFailure("HTTP 503".to_string())
        );
    }

    #[test]
    fn test_transport_error_is_transient() {
        let dir = TempDir::new().unwrap();
        let f = fetcher(
            &dir,
            MockHttpClient::new(Err(ProviderError::Timeout("read".to_string()))),
        );

        assert!(matches!(
            f.fetch(&TileCoord::new(1, 0, 0)),
            DownloadOutcome::TransientFailure(_)
        ));
    }

    #[test]
    fn test_undecodable_body_is_transient() {
        let dir = TempDir::new().unwrap();
        // Non-PNG content type forces a decode
        let f = fetcher(
            &dir,
            MockHttpClient::new(Ok(HttpResponse::new(200, b"garbage".to_vec())
                .with_content_type("image/jpeg"))),
        );
        let coord = TileCoord::new(2, 1, 1);

        assert!(matches!(
            f.fetch(&coord),
            DownloadOutcome::TransientFailure(_)
        ));
        assert_eq!(f.store().status_of(&coord), TileStatus::Missing);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(DownloadOutcome::Success.to_string(), "success");
        assert_eq!(
            DownloadOutcome::PermanentMiss("HTTP 404".to_string()).to_string(),
            "permanent miss: HTTP 404"
        );
    }
}
