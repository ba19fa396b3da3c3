//! Predictive tile prefetching.
//!
//! Warms the tile cache for imagery just outside the visible region before
//! the user pans into it, without saturating network or CPU. The
//! [`PrefetchScheduler`] decides *what* to prefetch *when* (throttled,
//! direction-aware, one pending job at a time) and the worker spawned by
//! [`spawn_prefetch_worker`] executes jobs on the Tokio runtime so the
//! interactive surface is never blocked.
//!
//! # Guarantees and non-guarantees
//!
//! - At most one job is issued per throttle window, however many movement
//!   events arrive inside it.
//! - A newer job replaces a pending unstarted one (watch-slot semantics),
//!   so rapid back-and-forth panning bounds outstanding work to a small
//!   constant.
//! - A job already running when superseded is *not* cancelled mid-tile;
//!   it stops at the next generation check, and any tiles it already wrote
//!   stay valid because cache writes are idempotent.
//! - Prefetch failure is never user-visible and never retried; errors are
//!   logged and discarded.

mod config;
mod direction;
mod job;
mod scheduler;
mod worker;

pub use config::PrefetchConfig;
pub use direction::{MovementHistory, PanDirection};
pub use job::{PrefetchJob, PrefetchTrigger};
pub use scheduler::PrefetchScheduler;
pub use worker::spawn_prefetch_worker;
