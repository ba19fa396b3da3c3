//! Core domain values.
//!
//! A [`Point`] is one geolocated bench as served by the point API: an id,
//! a coordinate, and the free-text inscription label. Points are immutable
//! once fetched; identity is the id.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::coord::LatLon;

/// Matches HTML-ish tags embedded in inscription labels.
static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid pattern"));

/// A geolocated point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Stable identity assigned by the point API.
    pub id: i64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Raw inscription text; may contain markup.
    pub label: String,
}

impl Point {
    /// Create a new point.
    pub fn new(id: i64, latitude: f64, longitude: f64, label: impl Into<String>) -> Self {
        Self {
            id,
            latitude,
            longitude,
            label: label.into(),
        }
    }

    /// The point's coordinate.
    pub fn position(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }
}

/// Strips markup tags from a label, leaving plain text.
///
/// Inscription labels from the API embed line breaks and emphasis as HTML
/// tags; marker detail text wants the bare words.
pub fn strip_markup(label: &str) -> String {
    MARKUP.replace_all(label, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_round_trips_coordinates() {
        let point = Point::new(7, 51.5, -0.1, "In memory");
        let pos = point.position();
        assert_eq!(pos.latitude, 51.5);
        assert_eq!(pos.longitude, -0.1);
    }

    #[test]
    fn test_strip_markup_removes_tags() {
        assert_eq!(
            strip_markup("In loving memory<br/>of <b>A. Bench</b>"),
            "In loving memoryof A. Bench"
        );
    }

    #[test]
    fn test_strip_markup_leaves_plain_text() {
        assert_eq!(strip_markup("No tags here"), "No tags here");
    }

    #[test]
    fn test_strip_markup_handles_unclosed_angle() {
        // A bare '<' with no closing '>' is not a tag
        assert_eq!(strip_markup("a < b"), "a < b");
    }
}
