//! HTTP implementations of the point and geocoder clients.

use tracing::warn;

use crate::coord::LatLon;
use crate::model::Point;
use crate::BoxFuture;

use super::types::{ApiError, FeatureCollection, GeocodeResponse, PointDetails};

/// Async client for the point API.
pub trait PointClient: Send + Sync {
    /// Points within `radius_m` meters of `center`.
    fn nearby(&self, center: LatLon, radius_m: u32) -> BoxFuture<'_, Result<Vec<Point>, ApiError>>;

    /// Points whose inscription matches a free-text query.
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<Point>, ApiError>>;

    /// The richer record for one point; `None` when the id is unknown.
    fn details(&self, id: i64) -> BoxFuture<'_, Result<Option<PointDetails>, ApiError>>;
}

/// Async reverse-geocoding lookup.
///
/// Failure is non-fatal; callers render a short inline error and move on.
pub trait ReverseGeocoder: Send + Sync {
    /// Human-readable address for a coordinate, when one is known.
    fn reverse(&self, position: LatLon) -> BoxFuture<'_, Result<Option<String>, ApiError>>;
}

/// Point client backed by `reqwest` against a configurable base URL.
pub struct HttpPointClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPointClient {
    /// Create a client for the given API base URL (no trailing slash needed).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("benchmap/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_features(&self, url: String) -> Result<Vec<Point>, ApiError> {
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
            });
        }

        let collection: FeatureCollection = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        let total = collection.features.len();
        let points: Vec<Point> = collection
            .features
            .into_iter()
            .filter_map(|f| f.into_point())
            .collect();

        if points.len() < total {
            warn!(
                dropped = total - points.len(),
                "Dropped features with malformed coordinates"
            );
        }

        Ok(points)
    }
}

impl PointClient for HttpPointClient {
    fn nearby(&self, center: LatLon, radius_m: u32) -> BoxFuture<'_, Result<Vec<Point>, ApiError>> {
        let url = format!(
            "{}/nearest/?latitude={}&longitude={}&distance={}",
            self.base_url, center.latitude, center.longitude, radius_m
        );
        Box::pin(self.get_features(url))
    }

    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<Point>, ApiError>> {
        Box::pin(async move {
            let url = reqwest::Url::parse_with_params(
                &format!("{}/search", self.base_url),
                &[("search", query)],
            )
            .map_err(|e| ApiError::Http(e.to_string()))?;
            self.get_features(url.to_string()).await
        })
    }

    fn details(&self, id: i64) -> BoxFuture<'_, Result<Option<PointDetails>, ApiError>> {
        Box::pin(async move {
            let url = format!("{}/bench/{}?truncated=false", self.base_url, id);
            let response = self
                .client
                .get(&url)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(|e| ApiError::Http(e.to_string()))?;

            let status = response.status();
            if status.as_u16() == 404 {
                return Ok(None);
            }
            if !status.is_success() {
                return Err(ApiError::Status {
                    status: status.as_u16(),
                });
            }

            let collection: FeatureCollection = response
                .json()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))?;

            Ok(collection
                .features
                .into_iter()
                .next()
                .map(|f| f.into_details()))
        })
    }
}

/// Reverse geocoder against an OpenCage-style endpoint.
pub struct OpenCageGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenCageGeocoder {
    /// Create a geocoder with the given base URL and API key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("benchmap/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| ApiError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

impl ReverseGeocoder for OpenCageGeocoder {
    fn reverse(&self, position: LatLon) -> BoxFuture<'_, Result<Option<String>, ApiError>> {
        Box::pin(async move {
            let url = format!(
                "{}/geocode/v1/json?q={},{}&key={}",
                self.base_url, position.latitude, position.longitude, self.api_key
            );
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| ApiError::Http(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ApiError::Status {
                    status: status.as_u16(),
                });
            }

            let decoded: GeocodeResponse = response
                .json()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))?;

            Ok(decoded.results.into_iter().find_map(|r| r.formatted))
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::api::types::MediaItem;
    use parking_lot::Mutex;

    /// Mock point client serving canned collections.
    pub struct MockPointClient {
        pub points: Mutex<Result<Vec<Point>, ApiError>>,
        pub details: Mutex<Option<PointDetails>>,
    }

    impl MockPointClient {
        pub fn with_points(points: Vec<Point>) -> Self {
            Self {
                points: Mutex::new(Ok(points)),
                details: Mutex::new(None),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                points: Mutex::new(Err(ApiError::Http(message.to_string()))),
                details: Mutex::new(None),
            }
        }
    }

    impl PointClient for MockPointClient {
        fn nearby(
            &self,
            _center: LatLon,
            _radius_m: u32,
        ) -> BoxFuture<'_, Result<Vec<Point>, ApiError>> {
            let result = self.points.lock().clone();
            Box::pin(async move { result })
        }

        fn search<'a>(&'a self, _query: &'a str) -> BoxFuture<'a, Result<Vec<Point>, ApiError>> {
            let result = self.points.lock().clone();
            Box::pin(async move { result })
        }

        fn details(&self, id: i64) -> BoxFuture<'_, Result<Option<PointDetails>, ApiError>> {
            let canned = self.details.lock().clone();
            Box::pin(async move { Ok(canned.filter(|d| d.id == id)) })
        }
    }

    #[tokio::test]
    async fn test_mock_details_filters_by_id() {
        let mock = MockPointClient::with_points(vec![]);
        *mock.details.lock() = Some(PointDetails {
            id: 42,
            label: "bench".to_string(),
            created_at: None,
            media: vec![MediaItem {
                url: "https://img/1.jpg".to_string(),
                media_type: None,
                license: None,
            }],
        });

        assert!(mock.details(42).await.unwrap().is_some());
        assert!(mock.details(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mock_failure_is_displayable() {
        let mock = MockPointClient::failing("connection refused");
        let err = mock.nearby(LatLon::new(0.0, 0.0), 200).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
