//! API payload types and errors.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::model::Point;

/// Errors from the point API or the geocoder.
///
/// The `Display` form is the user-visible message; data errors are non-fatal
/// and retryable by re-issuing the triggering action.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Transport-level failure.
    #[error("Network error: {0}")]
    Http(String),

    /// Non-success status from the server.
    #[error("Server returned HTTP {status}")]
    Status { status: u16 },

    /// Response body did not match the expected shape.
    #[error("Malformed response: {0}")]
    Decode(String),
}

/// One media attachment on a point's detail record.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    /// Media URL.
    pub url: String,
    /// Media type tag ("image", ...), when the server provides one.
    pub media_type: Option<String>,
    /// License string, when provided.
    pub license: Option<String>,
}

/// The richer record behind a single point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointDetails {
    /// Point identity.
    pub id: i64,
    /// Raw inscription text.
    pub label: String,
    /// Creation timestamp, when the server's value parses.
    pub created_at: Option<DateTime<Utc>>,
    /// Attached media, newest first as served.
    pub media: Vec<MediaItem>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire shapes
// ─────────────────────────────────────────────────────────────────────────────

/// GeoJSON-ish feature collection as served by the point API.
#[derive(Debug, Deserialize)]
pub(crate) struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Feature {
    pub id: i64,
    pub geometry: Option<Geometry>,
    pub properties: Option<Properties>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Geometry {
    /// GeoJSON order: longitude first, latitude second.
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Properties {
    #[serde(rename = "popupContent", default)]
    pub popup_content: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub media: Option<Vec<RawMedia>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMedia {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "media_type", default)]
    pub media_type: Option<String>,
    #[serde(rename = "licence", default)]
    pub license: Option<String>,
}

/// Geocoder response (OpenCage shape).
#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResponse {
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResult {
    pub formatted: Option<String>,
}

impl Feature {
    /// Convert a wire feature into a `Point`.
    ///
    /// Features with missing or short coordinate arrays are dropped by the
    /// caller (logged, not fatal); one malformed feature must not sink the
    /// whole collection.
    pub(crate) fn into_point(self) -> Option<Point> {
        let geometry = self.geometry?;
        if geometry.coordinates.len() < 2 {
            return None;
        }
        let label = self.properties.map(|p| p.popup_content).unwrap_or_default();
        Some(Point::new(
            self.id,
            geometry.coordinates[1],
            geometry.coordinates[0],
            label,
        ))
    }

    /// Convert a wire feature into a detail record.
    pub(crate) fn into_details(self) -> PointDetails {
        let properties = self.properties;
        let (label, created_at, media) = match properties {
            Some(p) => (
                p.popup_content,
                p.created_at.as_deref().and_then(parse_timestamp),
                p.media
                    .unwrap_or_default()
                    .into_iter()
                    .map(|m| MediaItem {
                        url: m.url,
                        media_type: m.media_type,
                        license: m.license,
                    })
                    .collect(),
            ),
            None => (String::new(), None, Vec::new()),
        };
        PointDetails {
            id: self.id,
            label,
            created_at,
            media,
        }
    }
}

/// Parse the server's timestamp formats leniently.
///
/// Accepts RFC 3339 or the bare `YYYY-MM-DD HH:MM:SS` form; anything else
/// yields `None` rather than an error.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_into_point_uses_geojson_order() {
        let feature: Feature = serde_json::from_str(
            r#"{"id": 7, "geometry": {"coordinates": [-0.1, 51.5]}, "properties": {"popupContent": "A bench"}}"#,
        )
        .unwrap();

        let point = feature.into_point().unwrap();
        assert_eq!(point.id, 7);
        assert_eq!(point.latitude, 51.5);
        assert_eq!(point.longitude, -0.1);
        assert_eq!(point.label, "A bench");
    }

    #[test]
    fn test_feature_without_coordinates_is_dropped() {
        let feature: Feature =
            serde_json::from_str(r#"{"id": 7, "geometry": {"coordinates": []}}"#).unwrap();
        assert!(feature.into_point().is_none());
    }

    #[test]
    fn test_details_parse_media_and_timestamp() {
        let feature: Feature = serde_json::from_str(
            r#"{
                "id": 42,
                "geometry": {"coordinates": [-0.1, 51.5]},
                "properties": {
                    "popupContent": "In memory",
                    "created_at": "2019-05-04 12:30:00",
                    "media": [{"URL": "https://img/1.jpg", "media_type": "image", "licence": "CC-BY"}]
                }
            }"#,
        )
        .unwrap();

        let details = feature.into_details();
        assert_eq!(details.id, 42);
        assert_eq!(details.media.len(), 1);
        assert_eq!(details.media[0].url, "https://img/1.jpg");
        assert!(details.created_at.is_some());
    }

    #[test]
    fn test_unparseable_timestamp_is_none() {
        assert!(parse_timestamp("last tuesday").is_none());
        assert!(parse_timestamp("2019-05-04 12:30:00").is_some());
        assert!(parse_timestamp("2019-05-04T12:30:00Z").is_some());
    }

    #[test]
    fn test_api_error_display_is_presentable() {
        let err = ApiError::Status { status: 503 };
        assert_eq!(err.to_string(), "Server returned HTTP 503");
    }
}
