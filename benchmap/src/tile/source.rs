//! Tile source naming and HTTP transport abstraction.

use bytes::Bytes;
use thiserror::Error;

use crate::coord::TileCoord;
use crate::BoxFuture;

/// Errors raised while fetching a tile.
///
/// Prefetch treats every variant the same way (log and discard), so the
/// variants exist for log fidelity, not control flow.
#[derive(Debug, Clone, Error)]
pub enum TileFetchError {
    /// Transport-level failure (connect, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success status from the tile server.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
}

/// A slippy-map imagery server.
///
/// Implementations only know how to name themselves and turn a tile
/// coordinate into a URL; the transport lives behind [`TileHttpClient`].
pub trait TileSource: Send + Sync {
    /// Short identifier used in logs and cache diagnostics.
    fn name(&self) -> &str;

    /// Highest zoom level the server offers.
    fn max_zoom(&self) -> u8;

    /// The URL serving the given tile.
    fn url(&self, tile: &TileCoord) -> String;
}

/// The standard OpenStreetMap raster tile server.
#[derive(Debug, Clone)]
pub struct OsmTileSource {
    base_url: String,
}

impl OsmTileSource {
    /// Create a source for the public OSM tile server.
    pub fn new() -> Self {
        Self {
            base_url: "https://tile.openstreetmap.org".to_string(),
        }
    }

    /// Create a source with a custom base URL (mirrors, test servers).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for OsmTileSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TileSource for OsmTileSource {
    fn name(&self) -> &str {
        "osm"
    }

    fn max_zoom(&self) -> u8 {
        19
    }

    fn url(&self, tile: &TileCoord) -> String {
        format!("{}/{}/{}/{}.png", self.base_url, tile.zoom, tile.col, tile.row)
    }
}

/// Async HTTP transport for tile downloads.
///
/// Abstracted from the prefetch worker so tests can inject a mock instead of
/// a live tile server.
pub trait TileHttpClient: Send + Sync {
    /// Performs an HTTP GET request for a tile URL.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, TileFetchError>>;
}

/// Real transport backed by `reqwest`.
///
/// Public tile servers reject anonymous clients, so the client always sends
/// a descriptive User-Agent.
pub struct ReqwestTileClient {
    client: reqwest::Client,
}

impl ReqwestTileClient {
    /// Creates a client with the default timeout.
    pub fn new() -> Result<Self, TileFetchError> {
        Self::with_timeout(std::time::Duration::from_secs(30))
    }

    /// Creates a client with a custom request timeout.
    pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, TileFetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("benchmap/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| TileFetchError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl TileHttpClient for ReqwestTileClient {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, TileFetchError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| TileFetchError::Http(format!("Request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                return Err(TileFetchError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            response
                .bytes()
                .await
                .map_err(|e| TileFetchError::Http(format!("Failed to read response: {e}")))
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock transport returning a canned response and counting requests.
    pub struct MockTileClient {
        pub response: Result<Bytes, TileFetchError>,
        pub requests: AtomicUsize,
    }

    impl MockTileClient {
        pub fn ok(payload: &[u8]) -> Self {
            Self {
                response: Ok(Bytes::copy_from_slice(payload)),
                requests: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                response: Err(TileFetchError::Http("connection refused".to_string())),
                requests: AtomicUsize::new(0),
            }
        }

        pub fn request_count(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    impl TileHttpClient for MockTileClient {
        fn get<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Bytes, TileFetchError>> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    #[test]
    fn test_osm_url_shape() {
        let source = OsmTileSource::new();
        let tile = TileCoord::new(10897, 16374, 15);
        assert_eq!(
            source.url(&tile),
            "https://tile.openstreetmap.org/15/16374/10897.png"
        );
    }

    #[test]
    fn test_custom_base_url() {
        let source = OsmTileSource::with_base_url("http://localhost:8080");
        let tile = TileCoord::new(1, 2, 3);
        assert_eq!(source.url(&tile), "http://localhost:8080/3/2/1.png");
    }

    #[tokio::test]
    async fn test_mock_client_success() {
        let mock = MockTileClient::ok(&[1, 2, 3, 4]);
        let result = mock.get("http://example.com/1/1/1.png").await;
        assert_eq!(result.unwrap().as_ref(), &[1, 2, 3, 4]);
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_client_error() {
        let mock = MockTileClient::failing();
        let result = mock.get("http://example.com/1/1/1.png").await;
        assert!(result.is_err());
    }
}
