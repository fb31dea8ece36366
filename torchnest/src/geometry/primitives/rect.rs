use anyhow::Result;
use anyhow::ensure;

use crate::geometry::geo_traits::CollidesWith;
use crate::geometry::primitives::Point;

/// Axis-aligned rectangle
#[derive(Clone, Debug, PartialEq, Copy)]
pub struct Rect {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Rect {
    pub fn try_new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<Self> {
        ensure!(
            x_min < x_max && y_min < y_max,
            "invalid rectangle, x_min: {x_min}, x_max: {x_max}, y_min: {y_min}, y_max: {y_max}"
        );
        Ok(Rect {
            x_min,
            y_min,
            x_max,
            y_max,
        })
    }

    /// Rectangle with its lower-left corner at (`x`, `y`).
    /// Callers are responsible for `width` and `height` being positive.
    pub fn from_dims(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x_min: x,
            y_min: y,
            x_max: x + width,
            y_max: y + height,
        }
    }

    /// Smallest rectangle containing every point in `points`.
    /// `None` for an empty set.
    pub fn bounding(points: &[Point]) -> Option<Self> {
        let mut iter = points.iter();
        let &Point(x, y) = iter.next()?;
        let mut bbox = Rect {
            x_min: x,
            y_min: y,
            x_max: x,
            y_max: y,
        };
        for &Point(px, py) in iter {
            bbox.x_min = bbox.x_min.min(px);
            bbox.y_min = bbox.y_min.min(py);
            bbox.x_max = bbox.x_max.max(px);
            bbox.y_max = bbox.y_max.max(py);
        }
        Some(bbox)
    }

    /// Returns `self` expanded by `margin` on all four sides.
    pub fn inflate(self, margin: f64) -> Self {
        Rect {
            x_min: self.x_min - margin,
            y_min: self.y_min - margin,
            x_max: self.x_max + margin,
            y_max: self.y_max + margin,
        }
    }

    /// True iff `other` lies entirely within `self` (boundaries included).
    pub fn contains(&self, other: &Rect) -> bool {
        self.x_min <= other.x_min
            && self.y_min <= other.y_min
            && self.x_max >= other.x_max
            && self.y_max >= other.y_max
    }

    /// True iff the interiors of `self` and `other` intersect.
    /// Rectangles that merely touch do not count as overlapping, so two
    /// pieces separated by exactly the kerf allowance remain legal.
    #[inline(always)]
    pub fn overlaps_interior(&self, other: &Rect) -> bool {
        f64::max(self.x_min, other.x_min) < f64::min(self.x_max, other.x_max)
            && f64::max(self.y_min, other.y_min) < f64::min(self.y_max, other.y_max)
    }

    /// True iff `point` lies strictly inside `self` (boundary excluded).
    #[inline(always)]
    pub fn contains_interior(&self, point: Point) -> bool {
        let Point(x, y) = point;
        x > self.x_min && x < self.x_max && y > self.y_min && y < self.y_max
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f64 {
        (self.x_max - self.x_min) * (self.y_max - self.y_min)
    }

    pub fn centroid(&self) -> Point {
        Point(
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point(self.x_min, self.y_min),
            Point(self.x_max, self.y_min),
            Point(self.x_max, self.y_max),
            Point(self.x_min, self.y_max),
        ]
    }
}

impl CollidesWith<Rect> for Rect {
    #[inline(always)]
    fn collides_with(&self, other: &Rect) -> bool {
        f64::max(self.x_min, other.x_min) <= f64::min(self.x_max, other.x_max)
            && f64::max(self.y_min, other.y_min) <= f64::min(self.y_max, other.y_max)
    }
}

impl CollidesWith<Point> for Rect {
    #[inline(always)]
    fn collides_with(&self, point: &Point) -> bool {
        let Point(x, y) = *point;
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_rects_collide_but_do_not_overlap() {
        let a = Rect::from_dims(0.0, 0.0, 10.0, 10.0);
        let b = Rect::from_dims(10.0, 0.0, 10.0, 10.0);
        assert!(a.collides_with(&b));
        assert!(!a.overlaps_interior(&b));
    }

    #[test]
    fn inflated_rects_detect_kerf_violations() {
        // separation of 2 mm, kerf of 2 mm: inflating both by 1 mm makes them touch
        let a = Rect::from_dims(0.0, 0.0, 10.0, 10.0).inflate(1.0);
        let b = Rect::from_dims(12.0, 0.0, 10.0, 10.0).inflate(1.0);
        assert!(a.collides_with(&b));
        assert!(!a.overlaps_interior(&b));

        // separation below the kerf
        let c = Rect::from_dims(10.5, 0.0, 10.0, 10.0).inflate(1.0);
        assert!(a.overlaps_interior(&c));
    }

    #[test]
    fn bounding_covers_all_points() {
        let bbox = Rect::bounding(&[Point(1.0, 2.0), Point(-3.0, 5.0), Point(4.0, -1.0)]);
        assert_eq!(
            bbox,
            Some(Rect {
                x_min: -3.0,
                y_min: -1.0,
                x_max: 4.0,
                y_max: 5.0
            })
        );
        assert_eq!(Rect::bounding(&[]), None);
    }
}
