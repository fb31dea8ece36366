use ordered_float::OrderedFloat;

use crate::geometry::geo_traits::DistanceTo;
use crate::geometry::primitives::Point;

/// Filters a set of points to only include those that form its convex hull.
///
/// Graham scan: pivot on the lowest (then leftmost) point, sort the rest by
/// polar angle around it and sweep, discarding every turn that is not a left
/// turn. Fewer than 3 distinct points, or an all-collinear set, yield an
/// empty hull.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 {
        return vec![];
    }

    let mut pts = points.to_vec();
    pts.sort_by_key(|p| (OrderedFloat(p.1), OrderedFloat(p.0)));
    pts.dedup();
    if pts.len() < 3 {
        return vec![];
    }

    let pivot = pts[0];
    let mut rest = pts.split_off(1);
    rest.sort_by_key(|p| {
        let angle = (p.1 - pivot.1).atan2(p.0 - pivot.0);
        (OrderedFloat(angle), OrderedFloat(pivot.sq_distance_to(p)))
    });

    let mut hull = vec![pivot];
    for p in rest {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }

    if hull.len() < 3 {
        // every point collinear with the pivot
        return vec![];
    }
    hull
}

fn cross(a: Point, b: Point, c: Point) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}
