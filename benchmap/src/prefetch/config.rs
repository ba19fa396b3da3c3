//! Prefetch configuration.

use std::time::Duration;

/// Default minimum interval between issued prefetch jobs.
///
/// Movement events arrive per gesture frame; one job per 100 ms is plenty
/// to stay ahead of a pan without hammering the tile server.
pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_millis(100);

/// Default quiet period after panning stops before a symmetric prefetch.
pub const DEFAULT_PAN_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Default quiet period after a zoom change before a symmetric prefetch.
///
/// Shorter than the pan settle: a zoom change invalidates the whole level,
/// so warming it early matters more.
pub const DEFAULT_ZOOM_SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Default delay after provider load before the initial cache warmup.
pub const DEFAULT_WARMUP_DELAY: Duration = Duration::from_millis(1000);

/// Default region expansion: each side grows by this fraction of the
/// viewport's own span.
pub const DEFAULT_EXPANSION_FACTOR: f64 = 1.0;

/// Default cap on tiles enumerated per job.
pub const DEFAULT_MAX_TILES_PER_JOB: usize = 64;

/// Default number of concurrent tile downloads per job.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

/// Tuning knobs for the prefetch scheduler and worker.
///
/// The timing defaults come from the behavior being replaced and are
/// best-effort policy, not contract; adjust freely per deployment.
#[derive(Debug, Clone)]
pub struct PrefetchConfig {
    /// Master switch; when false the scheduler plans nothing.
    pub enabled: bool,
    /// Minimum interval between issued jobs for pan-movement triggers.
    pub throttle_interval: Duration,
    /// Quiet period after panning stops before a settle prefetch.
    pub pan_settle_delay: Duration,
    /// Quiet period after a zoom change before a settle prefetch.
    pub zoom_settle_delay: Duration,
    /// Delay after provider load before the warmup prefetch.
    pub warmup_delay: Duration,
    /// Region growth per side, as a fraction of the viewport span.
    pub expansion_factor: f64,
    /// Upper bound on tiles enumerated per job.
    pub max_tiles_per_job: usize,
    /// Concurrent tile downloads within one job.
    pub fetch_concurrency: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            throttle_interval: DEFAULT_THROTTLE_INTERVAL,
            pan_settle_delay: DEFAULT_PAN_SETTLE_DELAY,
            zoom_settle_delay: DEFAULT_ZOOM_SETTLE_DELAY,
            warmup_delay: DEFAULT_WARMUP_DELAY,
            expansion_factor: DEFAULT_EXPANSION_FACTOR,
            max_tiles_per_job: DEFAULT_MAX_TILES_PER_JOB,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }
}

impl PrefetchConfig {
    /// Disable prefetching entirely.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set the throttle interval.
    pub fn with_throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle_interval = interval;
        self
    }

    /// Set the per-job tile cap.
    pub fn with_max_tiles_per_job(mut self, max: usize) -> Self {
        self.max_tiles_per_job = max;
        self
    }

    /// Set the per-job download concurrency.
    pub fn with_fetch_concurrency(mut self, concurrency: usize) -> Self {
        self.fetch_concurrency = concurrency.max(1);
        self
    }
}
