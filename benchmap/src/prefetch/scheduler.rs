//! Prefetch scheduling decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::debug;

use crate::coord::{BoundingBox, MAX_ZOOM};
use crate::telemetry::SessionMetrics;

use super::config::PrefetchConfig;
use super::direction::{MovementHistory, PanDirection};
use super::job::{PrefetchJob, PrefetchTrigger};

/// Decides what to prefetch and when.
///
/// The scheduler is synchronous and lives on the session loop; issuing a
/// job means publishing it to a `tokio::watch` slot where a newer job
/// replaces a pending unconsumed one. Execution belongs to the worker.
pub struct PrefetchScheduler {
    config: PrefetchConfig,
    history: MovementHistory,
    last_issued: Option<Instant>,
    generation: Arc<AtomicU64>,
    slot: watch::Sender<Option<PrefetchJob>>,
    metrics: Arc<SessionMetrics>,
}

impl PrefetchScheduler {
    /// Create a scheduler and the job slot its worker will watch.
    pub fn new(
        config: PrefetchConfig,
        metrics: Arc<SessionMetrics>,
    ) -> (Self, watch::Receiver<Option<PrefetchJob>>) {
        let (slot, slot_rx) = watch::channel(None);
        (
            Self {
                config,
                history: MovementHistory::new(),
                last_issued: None,
                generation: Arc::new(AtomicU64::new(0)),
                slot,
                metrics,
            },
            slot_rx,
        )
    }

    /// Shared generation counter for the worker's supersession checks.
    pub fn generation_handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.generation)
    }

    /// Movement hook: maybe issue a prefetch job for the current viewport.
    ///
    /// Pan triggers are throttled to one job per
    /// [`throttle_interval`](PrefetchConfig::throttle_interval) and shaped
    /// by the derived travel direction; settle and warmup triggers expand
    /// symmetrically and bypass the throttle (their quiet periods already
    /// debounce them).
    ///
    /// Returns the issued job, or `None` when the movement was dropped.
    pub fn on_movement(
        &mut self,
        viewport: BoundingBox,
        zoom: f64,
        trigger: PrefetchTrigger,
    ) -> Option<PrefetchJob> {
        if !self.config.enabled {
            return None;
        }

        if trigger == PrefetchTrigger::Pan {
            self.history.record(viewport.center());
        }

        if !viewport.has_area() {
            debug!(%viewport, "Rejecting prefetch for degenerate viewport");
            return None;
        }

        if trigger == PrefetchTrigger::Pan {
            if let Some(last) = self.last_issued {
                if last.elapsed() < self.config.throttle_interval {
                    self.metrics.prefetch_job_throttled();
                    return None;
                }
            }
        }

        let direction = match trigger {
            PrefetchTrigger::Pan => self.history.direction(),
            _ => PanDirection::None,
        };

        let region = expand_region(&viewport, direction, self.config.expansion_factor);
        if !region.has_area() {
            debug!(%region, %direction, "Expanded region has no area, skipping");
            return None;
        }

        let zoom_level = zoom.floor().clamp(0.0, MAX_ZOOM as f64) as u8;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let job = PrefetchJob {
            region,
            zoom: zoom_level,
            direction,
            trigger,
            generation,
            issued_at: Instant::now(),
        };

        self.last_issued = Some(job.issued_at);
        self.metrics.prefetch_job_issued();
        debug!(
            %region,
            zoom = zoom_level,
            %direction,
            %trigger,
            generation,
            "Prefetch job issued"
        );

        // A pending unconsumed job is replaced, never queued behind
        self.slot.send_replace(Some(job.clone()));
        Some(job)
    }

    /// Zoom changes invalidate the pan-direction history.
    pub fn on_zoom_changed(&mut self) {
        self.history.clear();
    }

    #[cfg(test)]
    pub(crate) fn history_mut(&mut self) -> &mut MovementHistory {
        &mut self.history
    }
}

/// Compute the region to warm for a viewport and travel direction.
///
/// With a known direction the region is the slab beyond the leading edge,
/// one expansion-factor of the viewport span deep; otherwise the viewport
/// grown symmetrically on all sides. Edges are clamped to the Web Mercator
/// domain.
fn expand_region(viewport: &BoundingBox, direction: PanDirection, factor: f64) -> BoundingBox {
    let lat_amount = viewport.lat_span() * factor;
    let lon_amount = viewport.lon_span() * factor;

    let slab = match direction {
        PanDirection::None => return viewport.expanded(lat_amount, lon_amount),
        PanDirection::North => BoundingBox::new(
            viewport.north + lat_amount,
            viewport.north,
            viewport.east,
            viewport.west,
        ),
        PanDirection::South => BoundingBox::new(
            viewport.south,
            viewport.south - lat_amount,
            viewport.east,
            viewport.west,
        ),
        PanDirection::East => BoundingBox::new(
            viewport.north,
            viewport.south,
            viewport.east + lon_amount,
            viewport.east,
        ),
        PanDirection::West => BoundingBox::new(
            viewport.north,
            viewport.south,
            viewport.west,
            viewport.west - lon_amount,
        ),
    };

    // Zero-amount expansion still clamps the edges to the world
    slab.expanded(0.0, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::LatLon;
    use std::time::Duration;

    fn scheduler(config: PrefetchConfig) -> (PrefetchScheduler, watch::Receiver<Option<PrefetchJob>>) {
        PrefetchScheduler::new(config, Arc::new(SessionMetrics::new()))
    }

    fn viewport() -> BoundingBox {
        BoundingBox::new(51.6, 51.4, 0.0, -0.2)
    }

    #[test]
    fn test_one_job_per_throttle_window() {
        let config = PrefetchConfig::default().with_throttle_interval(Duration::from_secs(10));
        let (mut scheduler, _rx) = scheduler(config);

        assert!(scheduler
            .on_movement(viewport(), 15.0, PrefetchTrigger::Pan)
            .is_some());
        for _ in 0..20 {
            assert!(scheduler
                .on_movement(viewport(), 15.0, PrefetchTrigger::Pan)
                .is_none());
        }
    }

    #[test]
    fn test_settle_triggers_bypass_throttle() {
        let config = PrefetchConfig::default().with_throttle_interval(Duration::from_secs(10));
        let (mut scheduler, _rx) = scheduler(config);

        assert!(scheduler
            .on_movement(viewport(), 15.0, PrefetchTrigger::Pan)
            .is_some());
        assert!(scheduler
            .on_movement(viewport(), 15.0, PrefetchTrigger::ZoomSettle)
            .is_some());
        assert!(scheduler
            .on_movement(viewport(), 15.0, PrefetchTrigger::PanSettle)
            .is_some());
    }

    #[test]
    fn test_degenerate_viewport_rejected() {
        let (mut scheduler, _rx) = scheduler(PrefetchConfig::default());
        let degenerate = BoundingBox::around(LatLon::new(51.5, -0.1));
        assert!(scheduler
            .on_movement(degenerate, 15.0, PrefetchTrigger::Warmup)
            .is_none());
    }

    #[test]
    fn test_symmetric_expansion_triples_span() {
        let (mut scheduler, _rx) = scheduler(
            PrefetchConfig::default().with_throttle_interval(Duration::ZERO),
        );
        let job = scheduler
            .on_movement(viewport(), 15.0, PrefetchTrigger::PanSettle)
            .unwrap();

        assert!((job.region.lat_span() - viewport().lat_span() * 3.0).abs() < 1e-9);
        assert!((job.region.lon_span() - viewport().lon_span() * 3.0).abs() < 1e-9);
        assert_eq!(job.direction, PanDirection::None);
    }

    #[test]
    fn test_directional_slab_beyond_leading_edge() {
        let (mut scheduler, _rx) = scheduler(
            PrefetchConfig::default().with_throttle_interval(Duration::ZERO),
        );

        // Seed an eastward pan
        let start = Instant::now();
        scheduler
            .history_mut()
            .record_at(LatLon::new(51.5, -0.3), start);
        scheduler
            .history_mut()
            .record_at(LatLon::new(51.5, -0.1), start + Duration::from_millis(200));

        let job = scheduler
            .on_movement(viewport(), 15.0, PrefetchTrigger::Pan)
            .unwrap();

        assert_eq!(job.direction, PanDirection::East);
        assert_eq!(job.region.west, viewport().east);
        assert!((job.region.lon_span() - viewport().lon_span()).abs() < 1e-9);
        assert_eq!(job.region.north, viewport().north);
        assert_eq!(job.region.south, viewport().south);
    }

    #[test]
    fn test_zoom_is_floored_to_integer_level() {
        let (mut scheduler, _rx) = scheduler(PrefetchConfig::default());
        let job = scheduler
            .on_movement(viewport(), 15.7, PrefetchTrigger::Warmup)
            .unwrap();
        assert_eq!(job.zoom, 15);
    }

    #[test]
    fn test_generations_increase() {
        let (mut scheduler, _rx) = scheduler(
            PrefetchConfig::default().with_throttle_interval(Duration::ZERO),
        );
        let first = scheduler
            .on_movement(viewport(), 15.0, PrefetchTrigger::Pan)
            .unwrap();
        let second = scheduler
            .on_movement(viewport(), 15.0, PrefetchTrigger::PanSettle)
            .unwrap();
        assert!(second.generation > first.generation);
    }

    #[test]
    fn test_slot_holds_only_latest_job() {
        let (mut scheduler, rx) = scheduler(
            PrefetchConfig::default().with_throttle_interval(Duration::ZERO),
        );
        scheduler.on_movement(viewport(), 15.0, PrefetchTrigger::Pan);
        let latest = scheduler
            .on_movement(viewport(), 15.0, PrefetchTrigger::PanSettle)
            .unwrap();

        let pending = rx.borrow().clone().unwrap();
        assert_eq!(pending.generation, latest.generation);
    }

    #[test]
    fn test_disabled_scheduler_plans_nothing() {
        let (mut scheduler, _rx) = scheduler(PrefetchConfig::disabled());
        assert!(scheduler
            .on_movement(viewport(), 15.0, PrefetchTrigger::Warmup)
            .is_none());
    }

    #[test]
    fn test_slab_at_world_edge_collapses_to_nothing() {
        let (mut scheduler, _rx) = scheduler(
            PrefetchConfig::default().with_throttle_interval(Duration::ZERO),
        );

        // Viewport pressed against the northern world edge, travelling north
        let start = Instant::now();
        scheduler
            .history_mut()
            .record_at(LatLon::new(84.0, 0.0), start);
        scheduler
            .history_mut()
            .record_at(LatLon::new(85.0, 0.0), start + Duration::from_millis(200));

        let polar = BoundingBox::new(crate::coord::MAX_LAT, 84.9, 0.5, -0.5);
        assert!(scheduler
            .on_movement(polar, 10.0, PrefetchTrigger::Pan)
            .is_none());
    }
}
