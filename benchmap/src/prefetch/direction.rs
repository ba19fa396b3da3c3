//! Movement direction derivation.
//!
//! Maintains a short history of recent viewport centers and derives the
//! dominant cardinal direction of travel from the oldest-to-newest
//! displacement. Direction is best-effort: when the displacement is too
//! small to be meaningful the history reports `None` and the scheduler
//! falls back to symmetric expansion.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use crate::coord::LatLon;

/// Maximum samples retained; only recent movement should steer prefetch.
const DEFAULT_MAX_SAMPLES: usize = 8;

/// Minimum interval between samples, matching the gesture-frame cadence.
const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Minimum displacement (degrees) for a reliable direction, ~11 m at the
/// equator; anything smaller is jitter.
const MIN_DISPLACEMENT_DEG: f64 = 1e-4;

/// Cardinal direction of recent viewport travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanDirection {
    /// Unknown or stationary.
    None,
    North,
    South,
    East,
    West,
}

impl fmt::Display for PanDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PanDirection::None => "none",
            PanDirection::North => "north",
            PanDirection::South => "south",
            PanDirection::East => "east",
            PanDirection::West => "west",
        };
        write!(f, "{name}")
    }
}

/// One recorded viewport center.
#[derive(Debug, Clone, Copy)]
struct CenterSample {
    center: LatLon,
    recorded_at: Instant,
}

/// Rolling history of viewport centers.
#[derive(Debug)]
pub struct MovementHistory {
    /// Recent samples, oldest first.
    samples: VecDeque<CenterSample>,
    max_samples: usize,
    sample_interval: Duration,
    min_displacement_deg: f64,
}

impl Default for MovementHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MovementHistory {
    /// Create a history with default limits.
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(DEFAULT_MAX_SAMPLES),
            max_samples: DEFAULT_MAX_SAMPLES,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            min_displacement_deg: MIN_DISPLACEMENT_DEG,
        }
    }

    /// Record a new viewport center.
    ///
    /// Respects the sample interval; samples arriving too quickly are
    /// ignored. Returns true if the sample was recorded.
    pub fn record(&mut self, center: LatLon) -> bool {
        self.record_at(center, Instant::now())
    }

    /// Record with an explicit timestamp.
    pub fn record_at(&mut self, center: LatLon, timestamp: Instant) -> bool {
        if let Some(last) = self.samples.back() {
            if timestamp.duration_since(last.recorded_at) < self.sample_interval {
                return false;
            }
        }

        self.samples.push_back(CenterSample {
            center,
            recorded_at: timestamp,
        });

        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }

        true
    }

    /// Derive the dominant direction of recent travel.
    ///
    /// Returns `PanDirection::None` with fewer than two samples or when the
    /// total displacement is below the jitter threshold.
    pub fn direction(&self) -> PanDirection {
        let (Some(oldest), Some(newest)) = (self.samples.front(), self.samples.back()) else {
            return PanDirection::None;
        };
        if self.samples.len() < 2 {
            return PanDirection::None;
        }

        let dlat = newest.center.latitude - oldest.center.latitude;
        let dlon = newest.center.longitude - oldest.center.longitude;

        if dlat.abs() < self.min_displacement_deg && dlon.abs() < self.min_displacement_deg {
            return PanDirection::None;
        }

        if dlat.abs() >= dlon.abs() {
            if dlat > 0.0 {
                PanDirection::North
            } else {
                PanDirection::South
            }
        } else if dlon > 0.0 {
            PanDirection::East
        } else {
            PanDirection::West
        }
    }

    /// Drop all history (zoom changes invalidate pan direction).
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Number of retained samples.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}
