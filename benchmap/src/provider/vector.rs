//! Vector/camera provider.
//!
//! Models a MapLibre-style vector backend: camera transitions fly rather
//! than jump, and the backend reports genuine animation completion. The
//! fly-to is simulated with a fixed-duration timer; a real widget binding
//! would drive the camera frames, but the contract (camera settles, event
//! fires, completion resolves) is the same.
//!
//! `animate_to` and `fit_bounds` spawn onto the ambient Tokio runtime, so
//! this provider must be used from within one.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::coord::{BoundingBox, LatLon};
use crate::markers::{MarkerKey, MarkerSpec};
use crate::BoxFuture;

use super::types::{fit_camera, MapProvider, ProviderEvent, ProviderEventSender, ProviderMode};

/// Duration of a simulated camera fly-to.
const FLY_TO_DURATION: Duration = Duration::from_millis(250);

/// Vector cameras render overzoomed tiles past the raster maximum.
const VECTOR_MAX_ZOOM: f64 = 20.0;

/// Fit padding: fraction of the box span added on each side.
const FIT_PADDING_FRACTION: f64 = 0.15;

/// Minimum span for a fit request.
const MIN_FIT_SPAN_DEG: f64 = 0.004;

/// Icon resources this backend ships.
const KNOWN_ICONS: &[&str] = &["marker", "pin", "dot"];

/// Fallback icon when a requested resource is missing.
const DEFAULT_ICON: &str = "dot";

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

struct Inner {
    camera: Mutex<(LatLon, f64)>,
    markers: DashMap<MarkerKey, MarkerSpec>,
    events: ProviderEventSender,
    state: Mutex<PendingState>,
}

struct PendingState {
    loaded: bool,
    queue: Vec<Pending>,
}

impl Inner {
    fn apply_camera(&self, center: LatLon, zoom: f64, gesture: bool) {
        let zoom = zoom.clamp(0.0, VECTOR_MAX_ZOOM);
        *self.camera.lock() = (center, zoom);
        let _ = self.events.send(ProviderEvent::ViewportChanged {
            center,
            zoom,
            gesture,
        });
    }

    fn insert_marker(&self, mut spec: MarkerSpec) {
        spec.icon = resolve_icon(spec.icon);
        self.markers.insert(spec.key, spec);
    }
}

/// Vector map backend with an animated camera.
pub struct VectorProvider {
    inner: Arc<Inner>,
}

impl VectorProvider {
    /// Create a provider with the given starting camera.
    pub fn new(center: LatLon, zoom: f64, events: ProviderEventSender) -> Self {
        Self {
            inner: Arc::new(Inner {
                camera: Mutex::new((center, zoom.clamp(0.0, VECTOR_MAX_ZOOM))),
                markers: DashMap::new(),
                events,
                state: Mutex::new(PendingState {
                    loaded: false,
                    queue: Vec::new(),
                }),
            }),
        }
    }

    /// Fly the camera to the target, resolving `done` when it settles.
    fn fly_to(&self, center: LatLon, zoom: f64, done: oneshot::Sender<()>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(FLY_TO_DURATION).await;
            inner.apply_camera(center, zoom, false);
            let _ = done.send(());
        });
    }
}

impl MapProvider for VectorProvider {
    fn name(&self) -> &'static str {
        "vector"
    }

    fn mode(&self) -> ProviderMode {
        ProviderMode::Vector
    }

    fn camera(&self) -> (LatLon, f64) {
        *self.inner.camera.lock()
    }

    fn set_center_and_zoom(&self, center: LatLon, zoom: f64) {
        {
            let mut state = self.inner.state.lock();
            if !state.loaded {
                state.queue.push(Pending::Jump { center, zoom });
                return;
            }
        }
        self.inner.apply_camera(center, zoom, false);
    }

    fn animate_to(&self, center: LatLon, zoom: f64) -> BoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.inner.state.lock();
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
        self.fly_to(center, zoom, tx);
        Box::pin(async move {
            let _ = rx.await;
        })
    }

    fn fit_bounds(&self, bounds: BoundingBox) -> BoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.inner.state.lock();
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
            VECTOR_MAX_ZOOM,
        );
        self.fly_to(center, zoom, tx);
        Box::pin(async move {
            let _ = rx.await;
        })
    }

    fn add_or_update_marker(&self, spec: MarkerSpec) {
        {
            let mut state = self.inner.state.lock();
            if !state.loaded {
                state.queue.push(Pending::AddMarker(spec));
                return;
            }
        }
        self.inner.insert_marker(spec);
    }

    fn remove_marker(&self, key: &MarkerKey) {
        {
            let mut state = self.inner.state.lock();
            if !state.loaded {
                state.queue.push(Pending::RemoveMarker(*key));
                return;
            }
        }
        self.inner.markers.remove(key);
    }

    fn marker_keys(&self) -> Vec<MarkerKey> {
        self.inner.markers.iter().map(|entry| *entry.key()).collect()
    }

    fn marker_snapshot(&self, key: &MarkerKey) -> Option<MarkerSpec> {
        self.inner.markers.get(key).map(|entry| entry.value().clone())
    }

    fn apply_gesture(&self, center: LatLon, zoom: f64) {
        self.inner.apply_camera(center, zoom, true);
    }

    fn notify_loaded(&self) {
        let drained = {
            let mut state = self.inner.state.lock();
            if state.loaded {
                return;
            }
            state.loaded = true;
            std::mem::take(&mut state.queue)
        };

        // Replayed commands apply instantly; animating a camera the user
        // has never seen would only delay readiness
        for pending in drained {
            match pending {
                Pending::Jump { center, zoom } => self.inner.apply_camera(center, zoom, false),
                Pending::Animate { center, zoom, done } => {
                    self.inner.apply_camera(center, zoom, false);
                    let _ = done.send(());
                }
                Pending::Fit { bounds, done } => {
                    let (center, zoom) = fit_camera(
                        &bounds,
                        FIT_PADDING_FRACTION,
                        MIN_FIT_SPAN_DEG,
                        VECTOR_MAX_ZOOM,
                    );
                    self.inner.apply_camera(center, zoom, false);
                    let _ = done.send(());
                }
                Pending::AddMarker(spec) => self.inner.insert_marker(spec),
                Pending::RemoveMarker(key) => {
                    self.inner.markers.remove(&key);
                }
            }
        }

        let _ = self.inner.events.send(ProviderEvent::Loaded);
    }
}

/// Resolve an icon request against the backend's resources.
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

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn provider() -> (VectorProvider, mpsc::UnboundedReceiver<ProviderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (VectorProvider::new(LatLon::new(51.5, -0.1), 15.0, tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fly_to_settles_then_completes() {
        let (provider, mut rx) = provider();
        provider.notify_loaded();
        assert_eq!(rx.recv().await, Some(ProviderEvent::Loaded));

        let completion = provider.animate_to(LatLon::new(48.85, 2.35), 12.0);

        // Camera has not moved before the fly-to settles
        assert_eq!(provider.camera().0, LatLon::new(51.5, -0.1));

        completion.await;
        assert_eq!(provider.camera(), (LatLon::new(48.85, 2.35), 12.0));

        assert!(matches!(
            rx.recv().await,
            Some(ProviderEvent::ViewportChanged { gesture: false, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fit_bounds_animates_and_completes() {
        let (provider, _rx) = provider();
        provider.notify_loaded();

        provider
            .fit_bounds(BoundingBox::new(3.0, 1.0, 3.0, 1.0))
            .await;

        let (center, zoom) = provider.camera();
        assert!((center.latitude - 2.0).abs() < 1e-9);
        assert!((center.longitude - 2.0).abs() < 1e-9);
        assert!(zoom > 0.0 && zoom < VECTOR_MAX_ZOOM);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fit_single_point_is_not_zero_area() {
        let (provider, _rx) = provider();
        provider.notify_loaded();

        provider
            .fit_bounds(BoundingBox::around(LatLon::new(5.0, 5.0)))
            .await;

        assert!(provider.camera().1 < VECTOR_MAX_ZOOM);
    }

    #[tokio::test]
    async fn test_queued_commands_replay_without_animation() {
        let (provider, _rx) = provider();
        let completion = provider.animate_to(LatLon::new(1.0, 2.0), 8.0);

        provider.notify_loaded();
        completion.await;

        assert_eq!(provider.camera(), (LatLon::new(1.0, 2.0), 8.0));
    }

    #[tokio::test]
    async fn test_marker_icon_fallback() {
        let (provider, _rx) = provider();
        provider.notify_loaded();

        provider.add_or_update_marker(MarkerSpec {
            key: MarkerKey::Point(1),
            position: LatLon::new(0.0, 0.0),
            title: "t".to_string(),
            detail: String::new(),
            icon: Some("sprite-that-does-not-exist".to_string()),
        });

        let snapshot = provider.marker_snapshot(&MarkerKey::Point(1)).unwrap();
        assert_eq!(snapshot.icon.as_deref(), Some(DEFAULT_ICON));
    }
}
