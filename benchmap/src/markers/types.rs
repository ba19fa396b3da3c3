//! Marker keys, specs, and reconciliation diffs.

use std::fmt;

use crate::coord::LatLon;

/// Stable identity of a marker.
///
/// Point markers are keyed by the point id; the current-user marker uses the
/// dedicated `User` key, rendered as `"self"` in display form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKey {
    /// A data-point marker.
    Point(i64),
    /// The current-user location marker.
    User,
}

impl fmt::Display for MarkerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerKey::Point(id) => write!(f, "{id}"),
            MarkerKey::User => write!(f, "self"),
        }
    }
}

/// Everything a provider needs to render one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    /// Marker identity.
    pub key: MarkerKey,
    /// Geographic position.
    pub position: LatLon,
    /// Short title shown in the inline summary.
    pub title: String,
    /// Longer detail text (markup already stripped).
    pub detail: String,
    /// Icon resource name; `None` uses the provider default.
    pub icon: Option<String>,
}

/// Result of a marker tap under two-stage disclosure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// First tap: show the inline summary for this marker.
    ShowSummary(MarkerKey),
    /// Second tap on a summarized point marker: open its detail view.
    OpenDetails(i64),
}

/// Operations to apply to the rendered marker set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerDiff {
    /// Markers to create.
    pub to_add: Vec<MarkerSpec>,
    /// Markers to update in place (position/text changed, same handle).
    pub to_update: Vec<MarkerSpec>,
    /// Marker keys to remove.
    pub to_remove: Vec<MarkerKey>,
}

impl MarkerDiff {
    /// Whether applying this diff would change anything.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }
}
