//! Raster-tile provider.
//!
//! Models an osmdroid-style raster backend: the camera jumps, there is no
//! native animation pipeline, and therefore no animation-completion signal.
//! Completions for `animate_to` and `fit_bounds` are synthesized by
//! resolving immediately after the command is applied.

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::coord::{BoundingBox, LatLon, MAX_ZOOM};
use crate::markers::{MarkerKey, MarkerSpec};
use crate::BoxFuture;

use super::types::{fit_camera, MapProvider, ProviderEvent, ProviderEventSender, ProviderMode};

/// Fit padding: fraction of the box span added on each side.
const FIT_PADDING_FRACTION: f64 = 0.10;

/// Minimum span for a fit request, so a degenerate box still frames an area.
const MIN_FIT_SPAN_DEG: f64 = 0.002;

/// Icon resources this backend ships.
const KNOWN_ICONS: &[&str] = &["marker", "pin"];

/// Fallback icon when a requested resource is missing.
const DEFAULT_ICON: &str = "pin";

enum Pending {
    Jump {
        center: LatLon,
        zoom: f64,
    },
    Animate {
        center: LatLon,
        zoom: f64,
        done: oneshot::Sender<()>,
    },
    Fit {
        bounds: BoundingBox,
        done: oneshot::Sender<()>,
    },
    AddMarker(MarkerSpec),
    RemoveMarker(MarkerKey),
}

struct PendingState {
    loaded: bool,
    queue: Vec<Pending>,
}

/// Raster-tile map backend.
pub struct RasterProvider {
    camera: Mutex<(LatLon, f64)>,
    markers: DashMap<MarkerKey, MarkerSpec>,
    events: ProviderEventSender,
    state: Mutex<PendingState>,
}

impl RasterProvider {
    /// Create a provider with the given starting camera.
    pub fn new(center: LatLon, zoom: f64, events: ProviderEventSender) -> Self {
        Self {
            camera: Mutex::new((center, clamp_zoom(zoom))),
            markers: DashMap::new(),
            events,
            state: Mutex::new(PendingState {
                loaded: false,
                queue: Vec::new(),
            }),
        }
    }

    fn jump(&self, center: LatLon, zoom: f64) {
        let zoom = clamp_zoom(zoom);
        *self.camera.lock() = (center, zoom);
        let _ = self.events.send(ProviderEvent::ViewportChanged {
            center,
            zoom,
            gesture: false,
        });
    }

    fn insert_marker(&self, mut spec: MarkerSpec) {
        spec.icon = resolve_icon(spec.icon);
        self.markers.insert(spec.key, spec);
    }
}

impl MapProvider for RasterProvider {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn mode(&self) -> ProviderMode {
        ProviderMode::Raster
    }

    fn camera(&self) -> (LatLon, f64) {
        *self.camera.lock()
    }

    fn set_center_and_zoom(&self, center: LatLon, zoom: f64) {
        {
            let mut state = self.state.lock();
            if !state.loaded {
                state.queue.push(Pending::Jump { center, zoom });
                return;
            }
        }
        self.jump(center, zoom);
    }

    fn animate_to(&self, center: LatLon, zoom: f64) -> BoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock();
            if !state.loaded {
                state.queue.push(Pending::Animate {
                    center,
                    zoom,
                    done: tx,
                });
                return Box::pin(async move {
                    let _ = rx.await;
                });
            }
        }
        // No animation pipeline: jump, then synthesize the completion
        self.jump(center, zoom);
        let _ = tx.send(());
        Box::pin(async move {
            let _ = rx.await;
        })
    }

    fn fit_bounds(&self, bounds: BoundingBox) -> BoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock();
            if !state.loaded {
                state.queue.push(Pending::Fit { bounds, done: tx });
                return Box::pin(async move {
                    let _ = rx.await;
                });
            }
        }
        let (center, zoom) = fit_camera(
            &bounds,
            FIT_PADDING_FRACTION,
            MIN_FIT_SPAN_DEG,
            MAX_ZOOM as f64,
        );
        self.jump(center, zoom);
        let _ = tx.send(());
        Box::pin(async move {
            let _ = rx.await;
        })
    }

    fn add_or_update_marker(&self, spec: MarkerSpec) {
        {
            let mut state = self.state.lock();
            if !state.loaded {
                state.queue.push(Pending::AddMarker(spec));
                return;
            }
        }
        self.insert_marker(spec);
    }

    fn remove_marker(&self, key: &MarkerKey) {
        {
            let mut state = self.state.lock();
            if !state.loaded {
                state.queue.push(Pending::RemoveMarker(*key));
                return;
            }
        }
        self.markers.remove(key);
    }

    fn marker_keys(&self) -> Vec<MarkerKey> {
        self.markers.iter().map(|entry| *entry.key()).collect()
    }

    fn marker_snapshot(&self, key: &MarkerKey) -> Option<MarkerSpec> {
        self.markers.get(key).map(|entry| entry.value().clone())
    }

    fn apply_gesture(&self, center: LatLon, zoom: f64) {
        let zoom = clamp_zoom(zoom);
        *self.camera.lock() = (center, zoom);
        let _ = self.events.send(ProviderEvent::ViewportChanged {
            center,
            zoom,
            gesture: true,
        });
    }

    fn notify_loaded(&self) {
        let drained = {
            let mut state = self.state.lock();
            if state.loaded {
                return;
            }
            state.loaded = true;
            std::mem::take(&mut state.queue)
        };

        for pending in drained {
            match pending {
                Pending::Jump { center, zoom } => self.jump(center, zoom),
                Pending::Animate { center, zoom, done } => {
                    self.jump(center, zoom);
                    let _ = done.send(());
                }
                Pending::Fit { bounds, done } => {
                    let (center, zoom) = fit_camera(
                        &bounds,
                        FIT_PADDING_FRACTION,
                        MIN_FIT_SPAN_DEG,
                        MAX_ZOOM as f64,
                    );
                    self.jump(center, zoom);
                    let _ = done.send(());
                }
                Pending::AddMarker(spec) => self.insert_marker(spec),
                Pending::RemoveMarker(key) => {
                    self.markers.remove(&key);
                }
            }
        }

        let _ = self.events.send(ProviderEvent::Loaded);
    }
}

fn clamp_zoom(zoom: f64) -> f64 {
    zoom.clamp(0.0, MAX_ZOOM as f64)
}

/// Resolve an icon request against the backend's resources.
///
/// A missing resource falls back to the default glyph instead of failing
/// the marker operation.
fn resolve_icon(icon: Option<String>) -> Option<String> {
    match icon {
        None => Some(DEFAULT_ICON.to_string()),
        Some(name) if KNOWN_ICONS.contains(&name.as_str()) => Some(name),
        Some(name) => {
            debug!(icon = %name, "Unknown marker icon, falling back to default");
            Some(DEFAULT_ICON.to_string())
        }
    }
}
