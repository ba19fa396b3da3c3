//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and the Web Mercator tile grid used by slippy-map imagery servers, plus
//! enumeration of the tiles covering a geographic region.

mod types;

pub use types::{
    BoundingBox, CoordError, LatLon, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
    MIN_ZOOM,
};

use std::f64::consts::PI;

/// Converts a geographic coordinate to the tile containing it.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 19)
///
/// # Returns
///
/// A `Result` containing the tile coordinate or an error if inputs are invalid.
#[inline]
pub fn to_tile_coord(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    // Validate inputs
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    // Number of tiles along each axis at this zoom level
    let n = 2.0_f64.powi(zoom as i32);

    // Longitude maps linearly onto tile columns
    let col = (((lon + 180.0) / 360.0 * n) as u32).min(n as u32 - 1);

    // Latitude maps through the Web Mercator projection onto tile rows
    let lat_rad = lat * PI / 180.0;
    let row = (((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as u32).min(n as u32 - 1);

    Ok(TileCoord { row, col, zoom })
}

/// Converts a tile coordinate back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);

    let lon = tile.col as f64 / n * 360.0 - 180.0;

    let y = tile.row as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}

/// Enumerates the tiles covering a bounding box at one zoom level.
///
/// The region is clamped to the Web Mercator domain before conversion. Tiles
/// are yielded in row-major order (north to south, west to east).
///
/// # Errors
///
/// Returns `CoordError::DegenerateRegion` when the box has no area and
/// `CoordError::InvalidZoom` when the zoom level is unsupported.
pub fn tiles_in_region(
    region: &BoundingBox,
    zoom: u8,
) -> Result<impl Iterator<Item = TileCoord>, CoordError> {
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }
    if !region.has_area() {
        return Err(CoordError::DegenerateRegion(region.to_string()));
    }

    let north = region.north.clamp(MIN_LAT, MAX_LAT);
    let south = region.south.clamp(MIN_LAT, MAX_LAT);
    let east = region.east.clamp(MIN_LON, MAX_LON);
    let west = region.west.clamp(MIN_LON, MAX_LON);

    let nw = to_tile_coord(north, west, zoom)?;
    let se = to_tile_coord(south, east, zoom)?;

    let rows = nw.row..=se.row;
    let cols = nw.col..=se.col;

    Ok(rows.flat_map(move |row| cols.clone().map(move |col| TileCoord { row, col, zoom })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_london_at_zoom_15() {
        // Central London: 51.5°N, 0.1°W
        let tile = to_tile_coord(51.5, -0.1, 15).unwrap();
        assert_eq!(tile.col, 16374);
        assert_eq!(tile.row, 10897);
        assert_eq!(tile.zoom, 15);
    }

    #[test]
    fn test_invalid_latitude() {
        let result = to_tile_coord(90.0, 0.0, 10);
        assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
    }

    #[test]
    fn test_invalid_zoom() {
        let result = to_tile_coord(0.0, 0.0, MAX_ZOOM + 1);
        assert!(matches!(result, Err(CoordError::InvalidZoom(_))));
    }

    #[test]
    fn test_tile_to_lat_lon_northwest_corner() {
        let tile = TileCoord::new(10897, 16374, 15);
        let (lat, lon) = tile_to_lat_lon(&tile);

        // Northwest corner of the tile containing central London
        assert!((lat - 51.502).abs() < 0.01, "latitude was {lat}");
        assert!((lon - (-0.110)).abs() < 0.01, "longitude was {lon}");
    }

    #[test]
    fn test_roundtrip_conversion() {
        let original_lat = 51.5074;
        let original_lon = -0.1278;
        let zoom = 16;

        let tile = to_tile_coord(original_lat, original_lon, zoom).unwrap();
        let (lat, lon) = tile_to_lat_lon(&tile);

        // Northwest corner is within one tile of the original point
        let tile_size = 360.0 / 2.0_f64.powi(zoom as i32);
        assert!((lat - original_lat).abs() < tile_size);
        assert!((lon - original_lon).abs() < tile_size);
    }

    #[test]
    fn test_tiles_in_region_count() {
        // A region spanning exactly two tile columns and one row at z=10
        let nw = tile_to_lat_lon(&TileCoord::new(340, 511, 10));
        let inner = tile_to_lat_lon(&TileCoord::new(341, 513, 10));
        let region = BoundingBox::new(nw.0 - 0.01, inner.0 + 0.01, inner.1 - 0.01, nw.1 + 0.01);

        let tiles: Vec<_> = tiles_in_region(&region, 10).unwrap().collect();
        assert!(!tiles.is_empty());
        assert!(tiles.iter().all(|t| t.zoom == 10));
        assert!(tiles.iter().all(|t| t.is_valid()));
    }

    #[test]
    fn test_tiles_in_region_rejects_degenerate() {
        let region = BoundingBox::around(LatLon::new(51.5, -0.1));
        assert!(matches!(
            tiles_in_region(&region, 12),
            Err(CoordError::DegenerateRegion(_))
        ));
    }

    #[test]
    fn test_tiles_in_region_row_major_order() {
        let region = BoundingBox::new(51.6, 51.4, 0.1, -0.3);
        let tiles: Vec<_> = tiles_in_region(&region, 12).unwrap().collect();

        for pair in tiles.windows(2) {
            let earlier = (pair[0].row, pair[0].col);
            let later = (pair[1].row, pair[1].col);
            assert!(earlier < later, "tiles out of order: {earlier:?} then {later:?}");
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_roundtrip_property(
                lat in -85.05..85.05_f64,
                lon in -180.0..180.0_f64,
                zoom in 0u8..=19
            ) {
                let tile = to_tile_coord(lat, lon, zoom)?;
                let (converted_lat, converted_lon) = tile_to_lat_lon(&tile);

                let tile_size = 360.0 / 2.0_f64.powi(zoom as i32);

                prop_assert!(
                    (converted_lat - lat).abs() < tile_size,
                    "Latitude roundtrip failed: {} -> {} (tile_size: {})",
                    lat, converted_lat, tile_size
                );
                prop_assert!(
                    (converted_lon - lon).abs() < tile_size,
                    "Longitude roundtrip failed: {} -> {} (tile_size: {})",
                    lon, converted_lon, tile_size
                );
            }

            #[test]
            fn test_tile_coords_in_bounds(
                lat in -85.05..85.05_f64,
                lon in -180.0..180.0_f64,
                zoom in 0u8..=19
            ) {
                let tile = to_tile_coord(lat, lon, zoom)?;

                let max_tile = 2u32.pow(zoom as u32);
                prop_assert!(tile.row < max_tile);
                prop_assert!(tile.col < max_tile);
                prop_assert_eq!(tile.zoom, zoom);
            }

            #[test]
            fn test_longitude_monotonic(
                lat in 0.0..1.0_f64,
                lon1 in -180.0..-90.0_f64,
                lon2 in -90.0..0.0_f64,
                zoom in 10u8..=15
            ) {
                // For fixed latitude, increasing longitude never decreases column
                let tile1 = to_tile_coord(lat, lon1, zoom)?;
                let tile2 = to_tile_coord(lat, lon2, zoom)?;
                prop_assert!(tile1.col < tile2.col);
            }

            #[test]
            fn test_reject_invalid_latitude(
                lat in -90.0..-85.06_f64,
                lon in -180.0..180.0_f64,
                zoom in 0u8..=19
            ) {
                let result = to_tile_coord(lat, lon, zoom);
                prop_assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
            }

            #[test]
            fn test_region_tiles_within_region_tile_bounds(
                lat in -60.0..60.0_f64,
                lon in -170.0..170.0_f64,
                zoom in 8u8..=14
            ) {
                let center = LatLon::new(lat, lon);
                let region = BoundingBox::around(center).expanded(0.05, 0.05);

                let tiles: Vec<_> = tiles_in_region(&region, zoom)
                    .expect("expanded region has area")
                    .collect();

                prop_assert!(!tiles.is_empty());
                for tile in &tiles {
                    prop_assert!(tile.is_valid());
                }
            }
        }
    }
}
