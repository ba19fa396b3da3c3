//! Marker set reconciliation.
//!
//! Keeps the rendered marker set synchronized with the latest point
//! collection at minimal churn: a content fingerprint short-circuits all
//! point-marker work when nothing changed, and the current-user marker is
//! updated in place instead of being torn down and rebuilt. Marker taps go
//! through two-stage disclosure: summary first, details on the second tap.

mod reconciler;
mod types;

pub use reconciler::MarkerReconciler;
pub use types::{MarkerDiff, MarkerKey, MarkerSpec, TapOutcome};
