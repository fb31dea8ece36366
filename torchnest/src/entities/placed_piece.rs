use crate::geometry::primitives::{Point, Rect};

/// Quarter-turn orientations a piece can be placed at.
///
/// Rectangles are only ever placed at `R0` or `R90`; the full set applies to
/// polygonal outlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// True for turns that swap the bounding box dimensions.
    pub fn swaps_dims(&self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }

    /// Rotates a piece-local outline and re-anchors its bounding box at the
    /// origin.
    pub fn apply(&self, points: &[Point]) -> Vec<Point> {
        let rotated: Vec<Point> = points
            .iter()
            .map(|&Point(x, y)| match self {
                Rotation::R0 => Point(x, y),
                Rotation::R90 => Point(-y, x),
                Rotation::R180 => Point(-x, -y),
                Rotation::R270 => Point(y, -x),
            })
            .collect();
        match Rect::bounding(&rotated) {
            Some(bbox) => rotated
                .into_iter()
                .map(|Point(x, y)| Point(x - bbox.x_min, y - bbox.y_min))
                .collect(),
            None => rotated,
        }
    }
}

/// One placed unit on a sheet. Coordinates are the lower-left corner of the
/// post-orientation bounding box, sheet origin at its lower-left.
#[derive(Debug, Clone)]
pub struct PlacedPiece {
    /// Index of the originating request in the submitted piece list.
    pub piece_id: usize,
    pub x: f64,
    pub y: f64,
    /// Bounding box width after orientation.
    pub width: f64,
    /// Bounding box height after orientation.
    pub height: f64,
    pub rotation: Rotation,
    pub tag: Option<String>,
}

impl PlacedPiece {
    pub fn rect(&self) -> Rect {
        Rect::from_dims(self.x, self.y, self.width, self.height)
    }

    pub fn centroid(&self) -> Point {
        self.rect().centroid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turns_keep_outlines_origin_anchored() {
        let triangle = vec![Point(0.0, 0.0), Point(40.0, 0.0), Point(0.0, 20.0)];
        let turned = Rotation::R90.apply(&triangle);
        let bbox = Rect::bounding(&turned).unwrap();
        assert_eq!(bbox.x_min, 0.0);
        assert_eq!(bbox.y_min, 0.0);
        assert!((bbox.width() - 20.0).abs() < 1e-9);
        assert!((bbox.height() - 40.0).abs() < 1e-9);

        let full_turn = Rotation::R180.apply(&Rotation::R180.apply(&triangle));
        assert_eq!(full_turn, triangle);
    }

    #[test]
    fn rotation_metadata_is_consistent() {
        assert!(Rotation::R90.swaps_dims());
        assert!(Rotation::R270.swaps_dims());
        assert!(!Rotation::R0.swaps_dims());
        assert_eq!(Rotation::R270.degrees(), 270);
    }
}
