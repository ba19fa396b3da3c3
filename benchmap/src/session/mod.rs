//! The map session: the hub that ties everything together.
//!
//! A [`MapSession`] owns the active provider, the viewport controller, the
//! marker reconciler, and the prefetch scheduler, and runs the single-writer
//! event loop: gesture events, command acknowledgments and marker taps are
//! messages processed on this loop and never block. Network work (tile
//! prefetching, and whatever point fetching the embedding app does) runs on
//! Tokio workers and communicates back through channels.
//!
//! # Architecture
//!
//! ```text
//!            SessionHandle (UI layer)          MapProvider (widget glue)
//!                    │ commands/points                │ gestures/loaded
//!                    ▼                                ▼
//!                 ┌──────────────────────────────────────┐
//!                 │            MapSession loop           │
//!                 │  ViewportController · MarkerReconciler │
//!                 │          PrefetchScheduler           │
//!                 └──────────────┬───────────────────────┘
//!                                │ watch slot
//!                                ▼
//!                        prefetch worker → TileCache
//! ```
//!
//! Exactly one task writes the authoritative [`Viewport`]; everyone else
//! reads snapshots via [`SharedViewport`] or the session snapshot.

mod controller;
mod viewport;

pub use controller::{
    Command, CommandKind, ControllerState, Effect, ProviderCall, RequestOutcome,
    ViewportController,
};
pub use viewport::{SharedViewport, Viewport};

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::coord::LatLon;
use crate::fit::bounding_box_of;
use crate::markers::{MarkerKey, MarkerReconciler, TapOutcome};
use crate::model::Point;
use crate::prefetch::{spawn_prefetch_worker, PrefetchJob, PrefetchScheduler, PrefetchTrigger};
use crate::provider::{create_provider, MapProvider, ProviderEvent, ProviderMode};
use crate::telemetry::{SessionMetrics, TelemetrySnapshot};
use crate::tile::{TileCache, TileCacheStats, TileHttpClient, TileSource};

/// Tile-layer collaborators the session's prefetch worker uses.
pub struct SessionServices {
    /// Imagery server naming and URLs.
    pub tile_source: Arc<dyn TileSource>,
    /// Tile download transport.
    pub tile_client: Arc<dyn TileHttpClient>,
    /// The local tile cache to warm.
    pub tile_cache: Arc<TileCache>,
}

/// Callbacks exposed to the UI layer.
///
/// Each `*_handled` callback fires exactly once per accepted request of the
/// corresponding command, after the transition applies (or immediately when
/// the request is a no-op).
pub struct SessionCallbacks {
    /// Recenter-on-user was handled.
    pub recenter_handled: Box<dyn Fn() + Send + Sync>,
    /// Zoom-to-fit was handled.
    pub zoom_to_fit_handled: Box<dyn Fn() + Send + Sync>,
    /// Animate-to-target was handled.
    pub animation_handled: Box<dyn Fn() + Send + Sync>,
    /// The authoritative viewport changed.
    pub viewport_changed: Box<dyn Fn(Viewport) + Send + Sync>,
    /// A summarized marker was tapped through to its details.
    pub point_selected: Box<dyn Fn(i64) + Send + Sync>,
}

impl Default for SessionCallbacks {
    fn default() -> Self {
        Self {
            recenter_handled: Box::new(|| {}),
            zoom_to_fit_handled: Box::new(|| {}),
            animation_handled: Box::new(|| {}),
            viewport_changed: Box::new(|_| {}),
            point_selected: Box::new(|_| {}),
        }
    }
}

impl SessionCallbacks {
    /// Set the recenter acknowledgment.
    pub fn on_recenter_handled(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.recenter_handled = Box::new(f);
        self
    }

    /// Set the zoom-to-fit acknowledgment.
    pub fn on_zoom_to_fit_handled(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.zoom_to_fit_handled = Box::new(f);
        self
    }

    /// Set the animation acknowledgment.
    pub fn on_animation_handled(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.animation_handled = Box::new(f);
        self
    }

    /// Set the viewport-changed notification.
    pub fn on_viewport_changed(mut self, f: impl Fn(Viewport) + Send + Sync + 'static) -> Self {
        self.viewport_changed = Box::new(f);
        self
    }

    /// Set the click-through selection callback.
    pub fn on_point_selected(mut self, f: impl Fn(i64) + Send + Sync + 'static) -> Self {
        self.point_selected = Box::new(f);
        self
    }
}

/// Messages processed by the session loop.
enum SessionEvent {
    Request(Command),
    CommandCompleted(CommandKind),
    SetPoints(Vec<Point>),
    SetUserLocation(Option<LatLon>),
    MarkerTapped(MarkerKey),
    DismissSummary,
    Gesture(LatLon, f64),
    ProviderLoaded,
    SetProviderMode(ProviderMode),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Shutdown,
}

/// Point-in-time view of session state, for tests and the CLI.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Authoritative viewport.
    pub viewport: Viewport,
    /// Controller state.
    pub controller_state: ControllerState,
    /// Active provider mode.
    pub provider_mode: ProviderMode,
    /// Rendered marker keys.
    pub marker_keys: Vec<MarkerKey>,
    /// Marker currently showing its inline summary.
    pub summarized: Option<MarkerKey>,
    /// Session counters.
    pub telemetry: TelemetrySnapshot,
    /// Tile cache counters.
    pub tile_cache: TileCacheStats,
}

/// Cloneable handle for driving a running session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    /// Request recenter-on-user.
    pub fn request_recenter(&self) {
        let _ = self.tx.send(SessionEvent::Request(Command::Recenter));
    }

    /// Request zoom-to-fit over the current point collection.
    pub fn request_zoom_to_fit(&self) {
        let _ = self.tx.send(SessionEvent::Request(Command::ZoomToFit));
    }

    /// Request an animated transition to a coordinate.
    pub fn request_animate_to(&self, target: LatLon) {
        let _ = self.tx.send(SessionEvent::Request(Command::AnimateTo(target)));
    }

    /// Replace the point collection.
    pub fn set_points(&self, points: Vec<Point>) {
        let _ = self.tx.send(SessionEvent::SetPoints(points));
    }

    /// Update the last known user location.
    pub fn set_user_location(&self, location: Option<LatLon>) {
        let _ = self.tx.send(SessionEvent::SetUserLocation(location));
    }

    /// Report a marker tap from the widget.
    pub fn tap_marker(&self, key: MarkerKey) {
        let _ = self.tx.send(SessionEvent::MarkerTapped(key));
    }

    /// Dismiss the inline summary (background tap).
    pub fn dismiss_summary(&self) {
        let _ = self.tx.send(SessionEvent::DismissSummary);
    }

    /// Report a user gesture from the widget glue.
    pub fn gesture(&self, center: LatLon, zoom: f64) {
        let _ = self.tx.send(SessionEvent::Gesture(center, zoom));
    }

    /// Report that the map backend finished loading.
    pub fn provider_loaded(&self) {
        let _ = self.tx.send(SessionEvent::ProviderLoaded);
    }

    /// Switch the provider mode, preserving only the viewport.
    pub fn set_provider_mode(&self, mode: ProviderMode) {
        let _ = self.tx.send(SessionEvent::SetProviderMode(mode));
    }

    /// Fetch a state snapshot; `None` when the session has stopped.
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(SessionEvent::Snapshot(tx)).ok()?;
        rx.await.ok()
    }

    /// Stop the session loop.
    pub fn shutdown(&self) {
        let _ = self.tx.send(SessionEvent::Shutdown);
    }
}

enum LoopEvent {
    Provider(ProviderEvent),
    Session(SessionEvent),
    Settle,
}

/// The map session.
///
/// Construct with [`MapSession::new`], then drive with
/// [`run`](MapSession::run) on a Tokio runtime.
pub struct MapSession {
    config: SessionConfig,
    services: SessionServices,
    provider: Arc<dyn MapProvider>,
    provider_mode: ProviderMode,
    provider_events: mpsc::UnboundedReceiver<ProviderEvent>,
    controller: ViewportController,
    reconciler: MarkerReconciler,
    scheduler: PrefetchScheduler,
    prefetch_slot: Option<tokio::sync::watch::Receiver<Option<PrefetchJob>>>,
    shared_viewport: SharedViewport,
    points: Vec<Point>,
    user_location: Option<LatLon>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    callbacks: SessionCallbacks,
    metrics: Arc<SessionMetrics>,
    pan_settle_at: Option<Instant>,
    zoom_settle_at: Option<Instant>,
    warmup_at: Option<Instant>,
}

impl MapSession {
    /// Create a session and its handle.
    pub fn new(
        config: SessionConfig,
        services: SessionServices,
        callbacks: SessionCallbacks,
    ) -> (Self, SessionHandle) {
        let metrics = Arc::new(SessionMetrics::new());
        let (scheduler, prefetch_slot) =
            PrefetchScheduler::new(config.prefetch.clone(), Arc::clone(&metrics));

        let (provider_tx, provider_events) = mpsc::unbounded_channel();
        let viewport = config.initial_viewport;
        let provider = create_provider(
            config.provider_mode,
            viewport.center,
            viewport.zoom,
            provider_tx,
        );

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let handle = SessionHandle {
            tx: events_tx.clone(),
        };

        let session = Self {
            provider_mode: config.provider_mode,
            controller: ViewportController::new(viewport, config.recenter_zoom),
            reconciler: MarkerReconciler::new(),
            scheduler,
            prefetch_slot: Some(prefetch_slot),
            shared_viewport: SharedViewport::new(viewport),
            points: Vec::new(),
            user_location: None,
            provider,
            provider_events,
            events_rx,
            events_tx,
            callbacks,
            metrics,
            config,
            services,
            pan_settle_at: None,
            zoom_settle_at: None,
            warmup_at: None,
        };

        (session, handle)
    }

    /// Snapshot access to the authoritative viewport.
    pub fn shared_viewport(&self) -> SharedViewport {
        self.shared_viewport.clone()
    }

    /// Run the session loop until cancelled or shut down.
    pub async fn run(mut self, cancel: CancellationToken) {
        let worker_cancel = cancel.child_token();
        let worker = spawn_prefetch_worker(
            self.prefetch_slot.take().expect("run called once"),
            Arc::clone(&self.services.tile_source),
            Arc::clone(&self.services.tile_client),
            Arc::clone(&self.services.tile_cache),
            self.scheduler.generation_handle(),
            self.config.prefetch.clone(),
            Arc::clone(&self.metrics),
            worker_cancel.clone(),
        );

        info!(
            provider = self.provider.name(),
            center = %self.controller.viewport().center,
            zoom = self.controller.viewport().zoom,
            "Map session started"
        );

        loop {
            let next_deadline = [self.pan_settle_at, self.zoom_settle_at, self.warmup_at]
                .into_iter()
                .flatten()
                .min();
            let sleep_target = next_deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            let event = tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                maybe = self.provider_events.recv() => match maybe {
                    Some(event) => LoopEvent::Provider(event),
                    None => continue,
                },

                maybe = self.events_rx.recv() => match maybe {
                    Some(event) => LoopEvent::Session(event),
                    None => break,
                },

                _ = tokio::time::sleep_until(tokio::time::Instant::from_std(sleep_target)),
                    if next_deadline.is_some() => LoopEvent::Settle,
            };

            match event {
                LoopEvent::Provider(event) => self.handle_provider_event(event),
                LoopEvent::Session(event) => {
                    if !self.handle_session_event(event) {
                        break;
                    }
                }
                LoopEvent::Settle => self.handle_settle(),
            }
        }

        worker_cancel.cancel();
        let _ = worker.await;
        info!("Map session stopped");
    }

    fn handle_provider_event(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::ViewportChanged {
                center,
                zoom,
                gesture,
            } => {
                let effects = if gesture {
                    self.metrics.gesture();
                    self.controller.on_gesture(center, zoom)
                } else {
                    self.controller.on_provider_echo(center, zoom)
                };
                self.apply_effects(effects);
            }
            ProviderEvent::Loaded => {
                info!(provider = self.provider.name(), "Map backend loaded");
                self.warmup_at = Some(Instant::now() + self.config.prefetch.warmup_delay);
            }
        }
    }

    /// Returns false when the loop should stop.
    fn handle_session_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Request(command) => {
                let outcome = self.controller.request(command);
                if outcome.accepted {
                    self.metrics.command_accepted();
                }
                self.apply_effects(outcome.effects);
            }
            SessionEvent::CommandCompleted(kind) => {
                let effects = self.controller.on_command_completed(kind);
                self.apply_effects(effects);
            }
            SessionEvent::SetPoints(points) => {
                self.points = points;
                self.reconcile_markers();
            }
            SessionEvent::SetUserLocation(location) => {
                self.user_location = location;
                self.controller.set_user_location(location);
                self.reconcile_markers();
            }
            SessionEvent::MarkerTapped(key) => match self.reconciler.tap(key) {
                Some(TapOutcome::OpenDetails(id)) => (self.callbacks.point_selected)(id),
                Some(TapOutcome::ShowSummary(key)) => {
                    debug!(marker = %key, "Showing inline summary");
                }
                None => {}
            },
            SessionEvent::DismissSummary => self.reconciler.dismiss_summary(),
            SessionEvent::Gesture(center, zoom) => self.provider.apply_gesture(center, zoom),
            SessionEvent::ProviderLoaded => self.provider.notify_loaded(),
            SessionEvent::SetProviderMode(mode) => self.switch_provider(mode),
            SessionEvent::Snapshot(tx) => {
                let _ = tx.send(self.snapshot());
            }
            SessionEvent::Shutdown => return false,
        }
        true
    }

    fn handle_settle(&mut self) {
        let now = Instant::now();
        let viewport = self.controller.viewport();
        let bounds = viewport.visible_bounds(self.config.view_width_px, self.config.view_height_px);

        for (deadline, trigger) in [
            (&mut self.warmup_at, PrefetchTrigger::Warmup),
            (&mut self.zoom_settle_at, PrefetchTrigger::ZoomSettle),
            (&mut self.pan_settle_at, PrefetchTrigger::PanSettle),
        ] {
            if deadline.is_some_and(|at| at <= now) {
                *deadline = None;
                self.scheduler.on_movement(bounds, viewport.zoom, trigger);
            }
        }
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::ViewportChanged(viewport) => {
                    self.shared_viewport.store(viewport);
                    (self.callbacks.viewport_changed)(viewport);
                }
                Effect::MovementHook {
                    gesture: _,
                    zoom_changed,
                } => self.movement_hook(zoom_changed),
                Effect::Ack(kind) => {
                    self.metrics.command_acked();
                    match kind {
                        CommandKind::Recenter => (self.callbacks.recenter_handled)(),
                        CommandKind::ZoomToFit => (self.callbacks.zoom_to_fit_handled)(),
                        CommandKind::AnimateTo => (self.callbacks.animation_handled)(),
                    }
                }
                Effect::Provider { kind, call } => self.issue_provider_call(kind, call, &mut queue),
            }
        }
    }

    fn issue_provider_call(
        &mut self,
        kind: CommandKind,
        call: ProviderCall,
        queue: &mut VecDeque<Effect>,
    ) {
        match call {
            ProviderCall::SetCenterAndZoom { center, zoom } => {
                self.provider.set_center_and_zoom(center, zoom);
                // Jump commands complete synchronously
                queue.extend(self.controller.on_command_completed(kind));
            }
            ProviderCall::AnimateTo { center, zoom } => {
                let completion = self.provider.animate_to(center, zoom);
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    completion.await;
                    let _ = tx.send(SessionEvent::CommandCompleted(kind));
                });
            }
            ProviderCall::FitPoints => match bounding_box_of(&self.points) {
                None => {
                    debug!("Zoom-to-fit with an empty collection, acknowledging as no-op");
                    queue.extend(self.controller.on_command_completed(kind));
                }
                Some(bounds) => {
                    let completion = self.provider.fit_bounds(bounds);
                    let tx = self.events_tx.clone();
                    tokio::spawn(async move {
                        completion.await;
                        let _ = tx.send(SessionEvent::CommandCompleted(kind));
                    });
                }
            },
        }
    }

    /// Movement fan-out: immediate direction-aware prefetch plus settle
    /// timer scheduling.
    fn movement_hook(&mut self, zoom_changed: bool) {
        let viewport = self.controller.viewport();
        let bounds = viewport.visible_bounds(self.config.view_width_px, self.config.view_height_px);

        self.scheduler
            .on_movement(bounds, viewport.zoom, PrefetchTrigger::Pan);

        let now = Instant::now();
        if zoom_changed {
            self.scheduler.on_zoom_changed();
            self.zoom_settle_at = Some(now + self.config.prefetch.zoom_settle_delay);
        } else {
            self.pan_settle_at = Some(now + self.config.prefetch.pan_settle_delay);
        }
    }

    fn reconcile_markers(&mut self) {
        let diff = self.reconciler.reconcile(&self.points, self.user_location);
        if diff.is_empty() {
            return;
        }

        self.metrics.markers_added(diff.to_add.len() as u64);
        self.metrics.markers_removed(diff.to_remove.len() as u64);

        for key in &diff.to_remove {
            self.provider.remove_marker(key);
        }
        for spec in diff.to_add.into_iter().chain(diff.to_update) {
            self.provider.add_or_update_marker(spec);
        }
    }

    /// Tear down provider-facing state and rebuild against the new mode.
    ///
    /// Only the authoritative viewport value survives the switch.
    fn switch_provider(&mut self, mode: ProviderMode) {
        if mode == self.provider_mode {
            return;
        }

        let viewport = self.controller.viewport();
        info!(from = %self.provider_mode, to = %mode, "Switching provider mode");

        let (provider_tx, provider_events) = mpsc::unbounded_channel();
        self.provider = create_provider(mode, viewport.center, viewport.zoom, provider_tx);
        self.provider_events = provider_events;
        self.provider_mode = mode;

        self.controller = ViewportController::new(viewport, self.config.recenter_zoom);
        self.controller.set_user_location(self.user_location);
        self.reconciler = MarkerReconciler::new();

        self.pan_settle_at = None;
        self.zoom_settle_at = None;
        self.warmup_at = None;

        self.shared_viewport.store(viewport);

        // Markers queue inside the new provider until its backend loads
        self.reconcile_markers();
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            viewport: self.controller.viewport(),
            controller_state: self.controller.state(),
            provider_mode: self.provider_mode,
            marker_keys: self.provider.marker_keys(),
            summarized: self.reconciler.summarized(),
            telemetry: self.metrics.snapshot(),
            tile_cache: self.services.tile_cache.stats(),
        }
    }
}
