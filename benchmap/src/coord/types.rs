//! Geographic and tile coordinate types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.05112878;

/// Minimum latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -85.05112878;

/// Minimum longitude in degrees.
pub const MIN_LON: f64 = -180.0;

/// Maximum longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Minimum supported zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Maximum supported zoom level (standard OSM raster tiles).
pub const MAX_ZOOM: u8 = 19;

/// Errors for invalid coordinate inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude outside the Web Mercator range.
    #[error("Invalid latitude: {0} (must be within ±85.05112878)")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180].
    #[error("Invalid longitude: {0} (must be within ±180)")]
    InvalidLongitude(f64),

    /// Zoom level above the supported maximum.
    #[error("Invalid zoom level: {0} (max: {MAX_ZOOM})")]
    InvalidZoom(u8),

    /// A region with no area where one is required.
    #[error("Degenerate region: {0}")]
    DegenerateRegion(String),
}

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

impl LatLon {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check whether the coordinate lies within the Web Mercator domain.
    pub fn is_valid(&self) -> bool {
        (MIN_LAT..=MAX_LAT).contains(&self.latitude)
            && (MIN_LON..=MAX_LON).contains(&self.longitude)
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// An axis-aligned geographic bounding box.
///
/// Invariant maintained by constructors: `north >= south`. Longitudes are not
/// normalized across the antimeridian; the expansion helpers clamp latitude
/// to the Web Mercator domain and longitude to [-180, 180].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Northern edge latitude.
    pub north: f64,
    /// Southern edge latitude.
    pub south: f64,
    /// Eastern edge longitude.
    pub east: f64,
    /// Western edge longitude.
    pub west: f64,
}

impl BoundingBox {
    /// Create a bounding box from its four edges.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north: north.max(south),
            south: north.min(south),
            east,
            west,
        }
    }

    /// The box covering a single coordinate (zero area).
    pub fn around(point: LatLon) -> Self {
        Self::new(point.latitude, point.latitude, point.longitude, point.longitude)
    }

    /// Latitude extent in degrees.
    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    /// Longitude extent in degrees.
    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    /// Whether the box encloses a non-zero area.
    pub fn has_area(&self) -> bool {
        self.lat_span() > f64::EPSILON && self.lon_span() > f64::EPSILON
    }

    /// Geometric center of the box.
    pub fn center(&self) -> LatLon {
        LatLon::new(
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }

    /// Whether the box contains the given coordinate (edges inclusive).
    pub fn contains(&self, point: LatLon) -> bool {
        point.latitude <= self.north
            && point.latitude >= self.south
            && point.longitude <= self.east
            && point.longitude >= self.west
    }

    /// Grow the box outward by the given amounts on every side.
    ///
    /// Latitude edges are clamped to the Web Mercator domain and longitude
    /// edges to [-180, 180], so the result is always a valid region.
    pub fn expanded(&self, lat_amount: f64, lon_amount: f64) -> Self {
        Self {
            north: (self.north + lat_amount).min(MAX_LAT),
            south: (self.south - lat_amount).max(MIN_LAT),
            east: (self.east + lon_amount).min(MAX_LON),
            west: (self.west - lon_amount).max(MIN_LON),
        }
    }

    /// Extend the box to include the given coordinate.
    pub fn extend(&mut self, point: LatLon) {
        self.north = self.north.max(point.latitude);
        self.south = self.south.min(point.latitude);
        self.east = self.east.max(point.longitude);
        self.west = self.west.min(point.longitude);
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[N{:.4} S{:.4} E{:.4} W{:.4}]",
            self.north, self.south, self.east, self.west
        )
    }
}

/// A slippy-map tile coordinate.
///
/// `row` counts from the north, `col` from the antimeridian, both zero-based.
/// At zoom `z` the valid range for each axis is `0..2^z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Tile row (Y axis, north to south).
    pub row: u32,
    /// Tile column (X axis, west to east).
    pub col: u32,
    /// Zoom level.
    pub zoom: u8,
}

impl TileCoord {
    /// Create a new tile coordinate.
    pub fn new(row: u32, col: u32, zoom: u8) -> Self {
        Self { row, col, zoom }
    }

    /// Check row/col fall within the valid range for the zoom level.
    pub fn is_valid(&self) -> bool {
        let max_coord = 1u32 << self.zoom.min(MAX_ZOOM) as u32;
        self.zoom <= MAX_ZOOM && self.row < max_coord && self.col < max_coord
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.col, self.row)
    }
}
