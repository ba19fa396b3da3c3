//! Incremental marker reconciliation.

use std::collections::HashSet;
use std::hash::Hasher;

use fxhash::FxHasher64;

use crate::coord::LatLon;
use crate::model::{strip_markup, Point};

use super::types::{MarkerDiff, MarkerKey, MarkerSpec, TapOutcome};

/// Icon resource used for point markers.
const POINT_ICON: &str = "marker";

/// Title shown on the current-user marker.
const USER_MARKER_TITLE: &str = "You are here";

/// Maintains a derived marker set matching a source point collection.
///
/// Marker widgets are expensive to construct, so the reconciler never
/// rebuilds them wholesale: a fingerprint of the point collection skips all
/// point-marker work when the collection is unchanged, and otherwise only
/// the keys that appeared or disappeared produce operations. The
/// current-user marker is tracked independently and updated in place.
#[derive(Debug, Default)]
pub struct MarkerReconciler {
    /// Fingerprint of the last reconciled point collection.
    fingerprint: Option<u64>,
    /// Point ids currently represented by markers.
    point_ids: HashSet<i64>,
    /// Last known user-marker position, if one exists.
    user_position: Option<LatLon>,
    /// The marker currently showing its inline summary, if any.
    summarized: Option<MarkerKey>,
}

impl MarkerReconciler {
    /// Create an empty reconciler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile the marker set against the latest inputs.
    ///
    /// Returns the operations to apply to the rendered set. Calling twice
    /// with unchanged inputs returns an empty diff.
    pub fn reconcile(&mut self, points: &[Point], user_location: Option<LatLon>) -> MarkerDiff {
        let mut diff = MarkerDiff::default();

        self.reconcile_user(user_location, &mut diff);

        let fingerprint = fingerprint(points);
        if self.fingerprint == Some(fingerprint) {
            return diff;
        }

        let new_ids: HashSet<i64> = points.iter().map(|p| p.id).collect();

        for id in &self.point_ids {
            if !new_ids.contains(id) {
                diff.to_remove.push(MarkerKey::Point(*id));
            }
        }

        for point in points {
            if !self.point_ids.contains(&point.id) {
                diff.to_add.push(point_spec(point));
            }
        }

        // A summarized marker that disappeared cannot stay summarized
        if let Some(MarkerKey::Point(id)) = self.summarized {
            if !new_ids.contains(&id) {
                self.summarized = None;
            }
        }

        self.point_ids = new_ids;
        self.fingerprint = Some(fingerprint);
        diff
    }

    /// Handle a tap on a marker.
    ///
    /// Two-stage disclosure: the first tap on a marker shows its inline
    /// summary (dismissing any other summary); a second tap on the marker
    /// that is already summarized opens the detail view for point markers.
    /// Taps on unknown keys return `None`.
    pub fn tap(&mut self, key: MarkerKey) -> Option<TapOutcome> {
        let known = match key {
            MarkerKey::Point(id) => self.point_ids.contains(&id),
            MarkerKey::User => self.user_position.is_some(),
        };
        if !known {
            return None;
        }

        if self.summarized == Some(key) {
            return match key {
                MarkerKey::Point(id) => Some(TapOutcome::OpenDetails(id)),
                // The user marker has no detail view behind it
                MarkerKey::User => None,
            };
        }

        self.summarized = Some(key);
        Some(TapOutcome::ShowSummary(key))
    }

    /// Dismiss the current inline summary (tap on the map background).
    pub fn dismiss_summary(&mut self) {
        self.summarized = None;
    }

    /// The marker currently showing its summary, if any.
    pub fn summarized(&self) -> Option<MarkerKey> {
        self.summarized
    }

    /// Current marker keys (point ids plus the user marker when present).
    pub fn keys(&self) -> HashSet<MarkerKey> {
        let mut keys: HashSet<MarkerKey> =
            self.point_ids.iter().map(|id| MarkerKey::Point(*id)).collect();
        if self.user_position.is_some() {
            keys.insert(MarkerKey::User);
        }
        keys
    }

    fn reconcile_user(&mut self, user_location: Option<LatLon>, diff: &mut MarkerDiff) {
        match (self.user_position, user_location) {
            (None, Some(position)) => {
                diff.to_add.push(user_spec(position));
                self.user_position = Some(position);
            }
            (Some(previous), Some(position)) => {
                if previous != position {
                    // In-place move, no remove/add churn
                    diff.to_update.push(user_spec(position));
                    self.user_position = Some(position);
                }
            }
            (Some(_), None) => {
                diff.to_remove.push(MarkerKey::User);
                self.user_position = None;
                if self.summarized == Some(MarkerKey::User) {
                    self.summarized = None;
                }
            }
            (None, None) => {}
        }
    }
}

fn point_spec(point: &Point) -> MarkerSpec {
    MarkerSpec {
        key: MarkerKey::Point(point.id),
        position: point.position(),
        title: format!("Bench #{}", point.id),
        detail: strip_markup(&point.label),
        icon: Some(POINT_ICON.to_string()),
    }
}

fn user_spec(position: LatLon) -> MarkerSpec {
    MarkerSpec {
        key: MarkerKey::User,
        position,
        title: USER_MARKER_TITLE.to_string(),
        detail: String::new(),
        icon: None,
    }
}

/// Content fingerprint of a point collection.
///
/// Covers ids, coordinate bits, and labels so any observable change to the
/// collection changes the fingerprint.
fn fingerprint(points: &[Point]) -> u64 {
    let mut hasher = FxHasher64::default();
    hasher.write_usize(points.len());
    for point in points {
        hasher.write_i64(point.id);
        hasher.write_u64(point.latitude.to_bits());
        hasher.write_u64(point.longitude.to_bits());
        hasher.write(point.label.as_bytes());
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: i64) -> Point {
        Point::new(id, 51.0 + id as f64 * 0.01, -0.1, format!("Bench <b>{id}</b>"))
    }

    fn keys_of(ids: &[i64], with_user: bool) -> HashSet<MarkerKey> {
        let mut keys: HashSet<MarkerKey> = ids.iter().map(|id| MarkerKey::Point(*id)).collect();
        if with_user {
            keys.insert(MarkerKey::User);
        }
        keys
    }

    #[test]
    fn test_initial_reconcile_adds_all_points() {
        let mut reconciler = MarkerReconciler::new();
        let diff = reconciler.reconcile(&[point(1), point(2)], None);

        assert_eq!(diff.to_add.len(), 2);
        assert!(diff.to_remove.is_empty());
        assert_eq!(reconciler.keys(), keys_of(&[1, 2], false));
    }

    #[test]
    fn test_keys_match_collection_and_user() {
        let mut reconciler = MarkerReconciler::new();
        reconciler.reconcile(&[point(1), point(2)], Some(LatLon::new(51.5, -0.1)));
        assert_eq!(reconciler.keys(), keys_of(&[1, 2], true));

        reconciler.reconcile(&[point(2), point(3)], Some(LatLon::new(51.5, -0.1)));
        assert_eq!(reconciler.keys(), keys_of(&[2, 3], true));

        reconciler.reconcile(&[point(2), point(3)], None);
        assert_eq!(reconciler.keys(), keys_of(&[2, 3], false));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut reconciler = MarkerReconciler::new();
        let points = vec![point(1), point(2), point(3)];
        let user = Some(LatLon::new(51.5, -0.1));

        let first = reconciler.reconcile(&points, user);
        assert!(!first.is_empty());

        let second = reconciler.reconcile(&points, user);
        assert!(second.is_empty(), "unchanged inputs produced {second:?}");
    }

    #[test]
    fn test_unchanged_keys_are_untouched() {
        let mut reconciler = MarkerReconciler::new();
        reconciler.reconcile(&[point(1), point(2)], None);

        let diff = reconciler.reconcile(&[point(2), point(3)], None);
        assert_eq!(diff.to_add.len(), 1);
        assert_eq!(diff.to_add[0].key, MarkerKey::Point(3));
        assert_eq!(diff.to_remove, vec![MarkerKey::Point(1)]);
    }

    #[test]
    fn test_user_marker_updates_in_place() {
        let mut reconciler = MarkerReconciler::new();
        reconciler.reconcile(&[], Some(LatLon::new(51.5, -0.1)));

        let diff = reconciler.reconcile(&[], Some(LatLon::new(51.6, -0.2)));
        assert!(diff.to_add.is_empty());
        assert!(diff.to_remove.is_empty());
        assert_eq!(diff.to_update.len(), 1);
        assert_eq!(diff.to_update[0].key, MarkerKey::User);
    }

    #[test]
    fn test_user_marker_removed_when_location_lost() {
        let mut reconciler = MarkerReconciler::new();
        reconciler.reconcile(&[], Some(LatLon::new(51.5, -0.1)));

        let diff = reconciler.reconcile(&[], None);
        assert_eq!(diff.to_remove, vec![MarkerKey::User]);
    }

    #[test]
    fn test_point_spec_strips_markup() {
        let mut reconciler = MarkerReconciler::new();
        let diff = reconciler.reconcile(&[point(7)], None);
        assert_eq!(diff.to_add[0].detail, "Bench 7");
        assert_eq!(diff.to_add[0].title, "Bench #7");
    }

    #[test]
    fn test_two_stage_tap() {
        let mut reconciler = MarkerReconciler::new();
        reconciler.reconcile(&[point(7)], None);

        let first = reconciler.tap(MarkerKey::Point(7));
        assert_eq!(first, Some(TapOutcome::ShowSummary(MarkerKey::Point(7))));

        let second = reconciler.tap(MarkerKey::Point(7));
        assert_eq!(second, Some(TapOutcome::OpenDetails(7)));
    }

    #[test]
    fn test_tap_on_other_marker_moves_summary() {
        let mut reconciler = MarkerReconciler::new();
        reconciler.reconcile(&[point(1), point(2)], None);

        reconciler.tap(MarkerKey::Point(1));
        let outcome = reconciler.tap(MarkerKey::Point(2));

        // Tapping another marker summarizes it instead of opening details
        assert_eq!(outcome, Some(TapOutcome::ShowSummary(MarkerKey::Point(2))));
        assert_eq!(reconciler.summarized(), Some(MarkerKey::Point(2)));
    }

    #[test]
    fn test_tap_on_unknown_key_is_ignored() {
        let mut reconciler = MarkerReconciler::new();
        reconciler.reconcile(&[point(1)], None);
        assert_eq!(reconciler.tap(MarkerKey::Point(99)), None);
        assert_eq!(reconciler.tap(MarkerKey::User), None);
    }

    #[test]
    fn test_summary_cleared_when_marker_disappears() {
        let mut reconciler = MarkerReconciler::new();
        reconciler.reconcile(&[point(1)], None);
        reconciler.tap(MarkerKey::Point(1));

        reconciler.reconcile(&[point(2)], None);
        assert_eq!(reconciler.summarized(), None);
    }

    #[test]
    fn test_user_marker_second_tap_has_no_details() {
        let mut reconciler = MarkerReconciler::new();
        reconciler.reconcile(&[], Some(LatLon::new(51.5, -0.1)));

        assert_eq!(
            reconciler.tap(MarkerKey::User),
            Some(TapOutcome::ShowSummary(MarkerKey::User))
        );
        assert_eq!(reconciler.tap(MarkerKey::User), None);
    }

    #[test]
    fn test_fingerprint_sensitive_to_label_change() {
        let mut reconciler = MarkerReconciler::new();
        let mut points = vec![point(1)];
        reconciler.reconcile(&points, None);

        points[0].label = "Rewritten".to_string();
        // Same keys, changed content: fingerprint differs but the key set
        // diff is empty, so nothing is rebuilt
        let diff = reconciler.reconcile(&points, None);
        assert!(diff.is_empty());

        // And the new fingerprint sticks
        let again = reconciler.reconcile(&points, None);
        assert!(again.is_empty());
    }
}
