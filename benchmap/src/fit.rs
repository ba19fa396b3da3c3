//! Bounding-box fitting for point collections.
//!
//! Computes the minimal geographic box containing a set of points. The raw
//! box is handed to the active map provider's fit operation, which applies
//! its own padding policy; a degenerate (single point or identical points)
//! box is still a valid fit request because every provider enforces a
//! minimum span before computing the target camera.

use crate::coord::BoundingBox;
use crate::model::Point;

/// Computes the minimal bounding box containing every point.
///
/// Returns `None` for an empty collection: there is nothing to fit, and
/// callers treat that as a no-op.
pub fn bounding_box_of(points: &[Point]) -> Option<BoundingBox> {
    let first = points.first()?;
    let mut bbox = BoundingBox::around(first.position());
    for point in &points[1..] {
        bbox.extend(point.position());
    }
    Some(bbox)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: i64, lat: f64, lon: f64) -> Point {
        Point::new(id, lat, lon, format!("bench {id}"))
    }

    #[test]
    fn test_empty_collection_fits_nothing() {
        assert_eq!(bounding_box_of(&[]), None);
    }

    #[test]
    fn test_box_spans_extremes() {
        let points = vec![point(1, 1.0, 1.0), point(2, 3.0, 3.0), point(3, 2.0, 2.0)];
        let bbox = bounding_box_of(&points).unwrap();
        assert_eq!(bbox.north, 3.0);
        assert_eq!(bbox.south, 1.0);
        assert_eq!(bbox.east, 3.0);
        assert_eq!(bbox.west, 1.0);
    }

    #[test]
    fn test_single_point_yields_degenerate_box() {
        let bbox = bounding_box_of(&[point(1, 5.0, 5.0)]).unwrap();
        assert_eq!(bbox.north, bbox.south);
        assert_eq!(bbox.east, bbox.west);
        assert!(!bbox.has_area());
    }

    #[test]
    fn test_order_independent() {
        let mut points = vec![point(1, -3.0, 7.0), point(2, 8.0, -2.0), point(3, 0.5, 0.5)];
        let forward = bounding_box_of(&points).unwrap();
        points.reverse();
        let reversed = bounding_box_of(&points).unwrap();
        assert_eq!(forward, reversed);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_box_contains_all_points(
                coords in proptest::collection::vec((-80.0..80.0_f64, -179.0..179.0_f64), 1..40)
            ) {
                let points: Vec<Point> = coords
                    .iter()
                    .enumerate()
                    .map(|(i, (lat, lon))| point(i as i64, *lat, *lon))
                    .collect();

                let bbox = bounding_box_of(&points).unwrap();
                for p in &points {
                    prop_assert!(bbox.contains(p.position()));
                }
            }

            #[test]
            fn test_box_edges_are_achieved(
                coords in proptest::collection::vec((-80.0..80.0_f64, -179.0..179.0_f64), 1..40)
            ) {
                let points: Vec<Point> = coords
                    .iter()
                    .enumerate()
                    .map(|(i, (lat, lon))| point(i as i64, *lat, *lon))
                    .collect();

                let bbox = bounding_box_of(&points).unwrap();
                prop_assert!(points.iter().any(|p| p.latitude == bbox.north));
                prop_assert!(points.iter().any(|p| p.latitude == bbox.south));
                prop_assert!(points.iter().any(|p| p.longitude == bbox.east));
                prop_assert!(points.iter().any(|p| p.longitude == bbox.west));
            }
        }
    }
}
