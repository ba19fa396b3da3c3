//! Prefetch job descriptions.

use std::fmt;
use std::time::Instant;

use crate::coord::BoundingBox;

use super::direction::PanDirection;

/// What prompted a prefetch decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchTrigger {
    /// Viewport moved during an active pan; throttled, direction-aware.
    Pan,
    /// Panning stopped and the quiet period elapsed.
    PanSettle,
    /// Zoom changed and the (shorter) quiet period elapsed.
    ZoomSettle,
    /// Initial warmup shortly after the provider loaded.
    Warmup,
}

impl fmt::Display for PrefetchTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrefetchTrigger::Pan => "pan",
            PrefetchTrigger::PanSettle => "pan-settle",
            PrefetchTrigger::ZoomSettle => "zoom-settle",
            PrefetchTrigger::Warmup => "warmup",
        };
        write!(f, "{name}")
    }
}

/// One unit of prefetch work handed to the background worker.
///
/// Ephemeral: created by the scheduler, consumed by the worker, and either
/// completed, failed, or superseded by a newer generation within bounded
/// time.
#[derive(Debug, Clone)]
pub struct PrefetchJob {
    /// Region to warm, already expanded beyond the visible viewport.
    pub region: BoundingBox,
    /// Single integer zoom level to fetch (never a range, to bound cost).
    pub zoom: u8,
    /// Direction of travel that shaped the region.
    pub direction: PanDirection,
    /// Trigger that produced the job.
    pub trigger: PrefetchTrigger,
    /// Scheduler generation at issue time; the worker stops early when a
    /// newer generation exists.
    pub generation: u64,
    /// When the scheduler issued the job.
    pub issued_at: Instant,
}
