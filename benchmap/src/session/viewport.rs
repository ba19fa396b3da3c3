//! The authoritative viewport value.

use std::f64::consts::PI;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::coord::{BoundingBox, LatLon};

/// The single authoritative map view: center plus zoom.
///
/// Exactly one instance is authoritative per session, owned and written by
/// the viewport controller on the session loop; everything else reads
/// snapshots through [`SharedViewport`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Map center.
    pub center: LatLon,
    /// Zoom level; fractional values are valid mid-gesture.
    pub zoom: f64,
}

impl Viewport {
    /// Create a viewport.
    pub fn new(center: LatLon, zoom: f64) -> Self {
        Self { center, zoom }
    }

    /// The geographic region visible in a view of the given pixel size.
    ///
    /// Standard Web Mercator: the world is `256 * 2^zoom` pixels wide, the
    /// view is centered on `center`, and the corners unproject back to
    /// geographic coordinates (clamped to the projection domain).
    pub fn visible_bounds(&self, width_px: f64, height_px: f64) -> BoundingBox {
        let scale = 256.0 * 2.0_f64.powf(self.zoom);
        let (cx, cy) = project(self.center, scale);

        let nw = unproject(cx - width_px / 2.0, cy - height_px / 2.0, scale);
        let se = unproject(cx + width_px / 2.0, cy + height_px / 2.0, scale);

        // Zero-amount expansion clamps the edges to the world
        BoundingBox::new(nw.latitude, se.latitude, se.longitude, nw.longitude).expanded(0.0, 0.0)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        // London, the app's historical starting view
        Self::new(LatLon::new(51.5, -0.1), 15.0)
    }
}

/// Project to world pixels at the given scale.
fn project(point: LatLon, scale: f64) -> (f64, f64) {
    let x = (point.longitude + 180.0) / 360.0 * scale;
    let lat_rad = point.latitude.to_radians();
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * scale;
    (x, y)
}

/// Unproject world pixels back to geographic coordinates.
fn unproject(x: f64, y: f64, scale: f64) -> LatLon {
    let lon = x / scale * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y / scale)).sinh().atan().to_degrees();
    LatLon::new(lat, lon)
}

/// Snapshot access to the authoritative viewport.
///
/// Cloneable and cheap; only the session writes through it.
#[derive(Debug, Clone, Default)]
pub struct SharedViewport {
    inner: Arc<RwLock<Viewport>>,
}

impl SharedViewport {
    /// Create with an initial value.
    pub fn new(viewport: Viewport) -> Self {
        Self {
            inner: Arc::new(RwLock::new(viewport)),
        }
    }

    /// Read the current value.
    pub fn snapshot(&self) -> Viewport {
        *self.inner.read()
    }

    /// Replace the value. Session-internal: the controller is the single
    /// writer.
    pub(crate) fn store(&self, viewport: Viewport) {
        *self.inner.write() = viewport;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_london() {
        let viewport = Viewport::default();
        assert_eq!(viewport.center, LatLon::new(51.5, -0.1));
        assert_eq!(viewport.zoom, 15.0);
    }

    #[test]
    fn test_visible_bounds_centered_on_viewport() {
        let viewport = Viewport::new(LatLon::new(51.5, -0.1), 15.0);
        let bounds = viewport.visible_bounds(1080.0, 1920.0);

        assert!(bounds.has_area());
        let center = bounds.center();
        assert!((center.latitude - 51.5).abs() < 0.01);
        assert!((center.longitude - (-0.1)).abs() < 0.001);
        assert!(bounds.contains(viewport.center));
    }

    #[test]
    fn test_zooming_in_shrinks_bounds() {
        let wide = Viewport::new(LatLon::new(51.5, -0.1), 12.0).visible_bounds(1080.0, 1920.0);
        let tight = Viewport::new(LatLon::new(51.5, -0.1), 16.0).visible_bounds(1080.0, 1920.0);

        assert!(tight.lat_span() < wide.lat_span());
        assert!(tight.lon_span() < wide.lon_span());
    }

    #[test]
    fn test_bounds_clamped_at_world_edge() {
        let viewport = Viewport::new(LatLon::new(85.0, 179.9), 3.0);
        let bounds = viewport.visible_bounds(1080.0, 1920.0);

        assert!(bounds.north <= crate::coord::MAX_LAT);
        assert!(bounds.east <= crate::coord::MAX_LON);
    }

    #[test]
    fn test_shared_viewport_snapshot_isolation() {
        let shared = SharedViewport::new(Viewport::default());
        let before = shared.snapshot();

        shared.store(Viewport::new(LatLon::new(48.85, 2.35), 12.0));
        assert_eq!(before.center, LatLon::new(51.5, -0.1));
        assert_eq!(shared.snapshot().center, LatLon::new(48.85, 2.35));
    }
}
