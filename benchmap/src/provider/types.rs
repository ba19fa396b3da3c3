//! Map provider capability contract.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::coord::{BoundingBox, LatLon};
use crate::markers::{MarkerKey, MarkerSpec};
use crate::BoxFuture;

/// Which provider implementation backs a session.
///
/// Fixed for the lifetime of a session run; switching modes tears down the
/// session's provider-facing state and recreates it; only the authoritative
/// viewport value carries over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderMode {
    /// Raster-tile backend with a discrete jump-to camera.
    Raster,
    /// Vector backend with an animated continuous camera.
    Vector,
}

impl fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderMode::Raster => write!(f, "raster"),
            ProviderMode::Vector => write!(f, "vector"),
        }
    }
}

impl FromStr for ProviderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raster" | "osm" => Ok(ProviderMode::Raster),
            "vector" => Ok(ProviderMode::Vector),
            other => Err(format!("Unknown provider mode: {other}")),
        }
    }
}

/// Events a provider reports back to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// The backend camera changed.
    ///
    /// `gesture` is true when the change came from direct user input rather
    /// than a programmatic command.
    ViewportChanged {
        center: LatLon,
        zoom: f64,
        gesture: bool,
    },
    /// The backend is ready; queued commands have been replayed.
    Loaded,
}

/// Channel on which a provider emits its events.
pub type ProviderEventSender = mpsc::UnboundedSender<ProviderEvent>;

/// Capability set any map-rendering backend must expose.
///
/// The trait is the narrow contract between the viewport controller and a
/// rendering backend: camera commands in, camera events out, plus a marker
/// registry. Implementations must queue commands issued before the backend
/// reports loaded and replay them in order, never drop them.
///
/// `animate_to` and `fit_bounds` resolve their returned future when the
/// transition completes. A backend without a native completion signal
/// synthesizes one by resolving immediately after applying the command.
pub trait MapProvider: Send + Sync {
    /// Implementation name for logs.
    fn name(&self) -> &'static str;

    /// Which mode this provider implements.
    fn mode(&self) -> ProviderMode;

    /// Current camera snapshot as (center, zoom).
    fn camera(&self) -> (LatLon, f64);

    /// Jump the camera to a center and zoom.
    fn set_center_and_zoom(&self, center: LatLon, zoom: f64);

    /// Animate the camera to a center and zoom; resolves on completion.
    fn animate_to(&self, center: LatLon, zoom: f64) -> BoxFuture<'static, ()>;

    /// Move the camera to show the given region; resolves on completion.
    ///
    /// Padding policy is provider-specific; a degenerate input box must
    /// still produce a valid non-zero-area view.
    fn fit_bounds(&self, bounds: BoundingBox) -> BoxFuture<'static, ()>;

    /// Create or update a marker.
    fn add_or_update_marker(&self, spec: MarkerSpec);

    /// Remove a marker; unknown keys are ignored.
    fn remove_marker(&self, key: &MarkerKey);

    /// Keys of all currently rendered markers.
    fn marker_keys(&self) -> Vec<MarkerKey>;

    /// Rendered state of one marker, icon resolved.
    fn marker_snapshot(&self, key: &MarkerKey) -> Option<MarkerSpec>;

    /// Backend-facing: report a user gesture that moved the camera.
    fn apply_gesture(&self, center: LatLon, zoom: f64);

    /// Backend-facing: the widget is ready to accept commands.
    fn notify_loaded(&self);
}

/// Computes the camera that shows `bounds` under a provider's fit policy.
///
/// Spans are floored to `min_span_deg` (degenerate boxes still fit to a
/// real area) and inflated by `padding_fraction` on each side; the zoom is
/// the largest whole level at which both padded spans fit the nominal view.
pub(crate) fn fit_camera(
    bounds: &BoundingBox,
    padding_fraction: f64,
    min_span_deg: f64,
    max_zoom: f64,
) -> (LatLon, f64) {
    let lat_span = bounds.lat_span().max(min_span_deg) * (1.0 + 2.0 * padding_fraction);
    let lon_span = bounds.lon_span().max(min_span_deg) * (1.0 + 2.0 * padding_fraction);

    // At zoom 0 the nominal view spans the whole world; each level halves it
    let zoom_for_lon = (360.0 / lon_span).log2();
    let zoom_for_lat = (180.0 / lat_span).log2();
    let zoom = zoom_for_lon.min(zoom_for_lat).clamp(0.0, max_zoom).floor();

    (bounds.center(), zoom)
}
