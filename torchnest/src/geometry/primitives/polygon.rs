use anyhow::{Context, Result, ensure};

use crate::geometry::geo_traits::{CollidesWith, DistanceTo};
use crate::geometry::primitives::{Point, Rect};
use crate::util::FPA;

/// Simple polygon defined by its outline points, with cached bounding box
/// and area. Orientation is normalized to counter-clockwise on construction.
#[derive(Clone, Debug)]
pub struct Polygon {
    pub points: Vec<Point>,
    pub bbox: Rect,
    pub area: f64,
}

impl Polygon {
    /// Fails for outlines with fewer than 3 points or (near-)zero area.
    pub fn try_new(mut points: Vec<Point>) -> Result<Self> {
        ensure!(
            points.len() >= 3,
            "polygon has too few points: {}",
            points.len()
        );
        let signed_area = shoelace_area(&points);
        ensure!(
            FPA(signed_area.abs()) != FPA(0.0),
            "polygon is degenerate, area: {signed_area}"
        );
        if signed_area < 0.0 {
            points.reverse();
        }
        let bbox = Rect::bounding(&points).context("polygon has no points")?;
        Ok(Polygon {
            points,
            bbox,
            area: signed_area.abs(),
        })
    }

    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        (0..n)
            .map(|i| self.points[i].distance_to(&self.points[(i + 1) % n]))
            .sum()
    }

    /// Returns `self` shifted by (`dx`, `dy`). Area is unaffected.
    pub fn translated(&self, dx: f64, dy: f64) -> Polygon {
        Polygon {
            points: self
                .points
                .iter()
                .map(|&Point(x, y)| Point(x + dx, y + dy))
                .collect(),
            bbox: Rect {
                x_min: self.bbox.x_min + dx,
                y_min: self.bbox.y_min + dy,
                x_max: self.bbox.x_max + dx,
                y_max: self.bbox.y_max + dy,
            },
            area: self.area,
        }
    }
}

/// Signed area of the outline, positive for counter-clockwise winding.
pub fn shoelace_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let Point(x0, y0) = points[i];
        let Point(x1, y1) = points[(i + 1) % n];
        sum += x0 * y1 - x1 * y0;
    }
    sum / 2.0
}

impl CollidesWith<Point> for Polygon {
    fn collides_with(&self, point: &Point) -> bool {
        // even-odd ray cast, horizontal ray shot to the right
        if !self.bbox.collides_with(point) {
            return false;
        }
        let Point(px, py) = *point;

        // a ray passing (almost) through a vertex gives unreliable crossing
        // counts, nudge the query upward in that case
        if self.points.iter().any(|v| FPA(v.1) == FPA(py)) {
            let nudge = f64::EPSILON * self.bbox.height().max(1.0) * 10_000.0;
            return self.collides_with(&Point(px, py + nudge));
        }

        let mut inside = false;
        let n = self.points.len();
        let mut j = n - 1;
        for i in 0..n {
            let Point(xi, yi) = self.points[i];
            let Point(xj, yj) = self.points[j];
            if (yi > py) != (yj > py) {
                let x_cross = xj + (py - yj) / (yi - yj) * (xi - xj);
                if px < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}
