use crate::geometry::convex_hull::convex_hull;
use crate::geometry::primitives::{Point, Polygon, Rect};

/// No-fit polygon of two outlines via a convex Minkowski sum.
///
/// The moving outline is reflected through the origin and summed pairwise
/// with the fixed outline; the convex hull of those sums bounds the region
/// of reference positions at which the outlines would overlap. The hull is
/// a conservative superset for concave outlines.
///
/// `fixed` is expected in sheet coordinates, `moving` in piece-local
/// coordinates with its reference point at the origin. Degenerate inputs
/// yield `None`, which callers must treat as always-overlapping.
pub fn minkowski_nfp(fixed: &[Point], moving: &[Point]) -> Option<Polygon> {
    if fixed.len() < 3 || moving.len() < 3 {
        return None;
    }
    let mut sums = Vec::with_capacity(fixed.len() * moving.len());
    for &Point(fx, fy) in fixed {
        for &Point(mx, my) in moving {
            // pairwise sum with the reflected moving point
            sums.push(Point(fx - mx, fy - my));
        }
    }
    Polygon::try_new(convex_hull(&sums)).ok()
}

/// Closed-form no-fit rectangle for an axis-aligned rectangle pair.
///
/// Reference positions (the moving rectangle's lower-left corner) strictly
/// inside the result would bring the two pieces closer than the kerf
/// allowance permits. width/height of the region come out as
/// `fixed + moving + kerf`.
pub fn rect_nfp(fixed: &Rect, moving_width: f64, moving_height: f64, kerf: f64) -> Rect {
    Rect {
        x_min: fixed.x_min - moving_width - kerf / 2.0,
        y_min: fixed.y_min - moving_height - kerf / 2.0,
        x_max: fixed.x_max + kerf / 2.0,
        y_max: fixed.y_max + kerf / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::geo_traits::CollidesWith;

    #[test]
    fn rect_nfp_dimensions_include_kerf_once() {
        let fixed = Rect::from_dims(0.0, 0.0, 100.0, 50.0);
        let nfp = rect_nfp(&fixed, 30.0, 20.0, 4.0);
        assert!((nfp.width() - 134.0).abs() < 1e-9);
        assert!((nfp.height() - 74.0).abs() < 1e-9);
        assert_eq!(nfp.x_min, -32.0);
        assert_eq!(nfp.y_min, -22.0);

        // a position flush against the fixed piece is excluded
        assert!(nfp.contains_interior(Point(100.0, 0.0)));
        // a position past the kerf margin is admissible
        assert!(!nfp.contains_interior(Point(103.0, 0.0)));
    }

    #[test]
    fn minkowski_nfp_excludes_overlapping_positions() {
        let fixed: Vec<Point> = vec![
            Point(0.0, 0.0),
            Point(50.0, 0.0),
            Point(50.0, 50.0),
            Point(0.0, 50.0),
        ];
        let moving: Vec<Point> = vec![
            Point(0.0, 0.0),
            Point(20.0, 0.0),
            Point(20.0, 20.0),
            Point(0.0, 20.0),
        ];
        let nfp = minkowski_nfp(&fixed, &moving).unwrap();

        // squares against squares give the exact no-fit rectangle
        assert!((nfp.bbox.width() - 70.0).abs() < 1e-9);
        assert!((nfp.bbox.height() - 70.0).abs() < 1e-9);
        assert!(nfp.collides_with(&Point(10.0, 10.0)));
        assert!(nfp.collides_with(&Point(-10.0, 25.0)));
        assert!(!nfp.collides_with(&Point(60.0, 0.0)));
        assert!(!nfp.collides_with(&Point(0.0, -30.0)));
    }

    #[test]
    fn degenerate_outlines_produce_no_nfp() {
        let fixed = vec![Point(0.0, 0.0), Point(10.0, 0.0)];
        let square = vec![
            Point(0.0, 0.0),
            Point(5.0, 0.0),
            Point(5.0, 5.0),
            Point(0.0, 5.0),
        ];
        assert!(minkowski_nfp(&fixed, &square).is_none());
        assert!(minkowski_nfp(&square, &fixed).is_none());
        // collinear moving outline collapses the hull
        let collinear = vec![Point(0.0, 0.0), Point(1.0, 1.0), Point(2.0, 2.0)];
        assert!(minkowski_nfp(&collinear, &collinear).is_none());
    }
}
