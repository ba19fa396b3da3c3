//! Session telemetry for observability and user feedback.
//!
//! Lock-free atomic counters updated from the session loop and the prefetch
//! worker, copied out as a point-in-time snapshot for display:
//!
//! ```text
//! Session / Scheduler / Worker ───► SessionMetrics ───► TelemetrySnapshot ───► Views
//!                                   (atomic counters)   (point-in-time copy)    (CLI)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters shared across the session.
#[derive(Debug, Default)]
pub struct SessionMetrics {
    gestures: AtomicU64,
    commands_accepted: AtomicU64,
    commands_acked: AtomicU64,
    prefetch_jobs_issued: AtomicU64,
    prefetch_jobs_throttled: AtomicU64,
    prefetch_jobs_completed: AtomicU64,
    prefetch_jobs_superseded: AtomicU64,
    tiles_fetched: AtomicU64,
    tile_fetch_failures: AtomicU64,
    markers_added: AtomicU64,
    markers_removed: AtomicU64,
}

/// Point-in-time copy of [`SessionMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    /// Gesture events processed.
    pub gestures: u64,
    /// Programmatic commands accepted.
    pub commands_accepted: u64,
    /// Command acknowledgments fired.
    pub commands_acked: u64,
    /// Prefetch jobs issued to the worker.
    pub prefetch_jobs_issued: u64,
    /// Movement events dropped by the throttle window.
    pub prefetch_jobs_throttled: u64,
    /// Prefetch jobs run to completion.
    pub prefetch_jobs_completed: u64,
    /// Prefetch jobs abandoned early because a newer one superseded them.
    pub prefetch_jobs_superseded: u64,
    /// Tiles downloaded into the cache.
    pub tiles_fetched: u64,
    /// Tile downloads that failed (logged and discarded).
    pub tile_fetch_failures: u64,
    /// Markers created.
    pub markers_added: u64,
    /// Markers removed.
    pub markers_removed: u64,
}

impl SessionMetrics {
    /// Create zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gesture(&self) {
        self.gestures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_accepted(&self) {
        self.commands_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_acked(&self) {
        self.commands_acked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn prefetch_job_issued(&self) {
        self.prefetch_jobs_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn prefetch_job_throttled(&self) {
        self.prefetch_jobs_throttled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn prefetch_job_completed(&self) {
        self.prefetch_jobs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn prefetch_job_superseded(&self) {
        self.prefetch_jobs_superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tiles_fetched(&self, count: u64) {
        self.tiles_fetched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn tile_fetch_failed(&self) {
        self.tile_fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn markers_added(&self, count: u64) {
        self.markers_added.fetch_add(count, Ordering::Relaxed);
    }

    pub fn markers_removed(&self, count: u64) {
        self.markers_removed.fetch_add(count, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            gestures: self.gestures.load(Ordering::Relaxed),
            commands_accepted: self.commands_accepted.load(Ordering::Relaxed),
            commands_acked: self.commands_acked.load(Ordering::Relaxed),
            prefetch_jobs_issued: self.prefetch_jobs_issued.load(Ordering::Relaxed),
            prefetch_jobs_throttled: self.prefetch_jobs_throttled.load(Ordering::Relaxed),
            prefetch_jobs_completed: self.prefetch_jobs_completed.load(Ordering::Relaxed),
            prefetch_jobs_superseded: self.prefetch_jobs_superseded.load(Ordering::Relaxed),
            tiles_fetched: self.tiles_fetched.load(Ordering::Relaxed),
            tile_fetch_failures: self.tile_fetch_failures.load(Ordering::Relaxed),
            markers_added: self.markers_added.load(Ordering::Relaxed),
            markers_removed: self.markers_removed.load(Ordering::Relaxed),
        }
    }
}
