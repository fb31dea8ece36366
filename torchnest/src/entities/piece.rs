use log::warn;

use crate::entities::placed_piece::Rotation;
use crate::entities::sheet::SheetSpec;
use crate::entities::solution::{PieceWarning, WarningKind};
use crate::geometry::primitives::Point;

/// Number of segments used to approximate a circular outline.
pub const CIRCLE_SEGMENTS: usize = 16;

/// A request for identical parts to be cut from sheet stock.
///
/// `width` and `height` describe the bounding box of the part in mm; the
/// shape refines the outline within that box. Requests are immutable once
/// submitted, engines work on expanded [PieceInstance]s.
#[derive(Debug, Clone)]
pub struct Piece {
    pub id: String,
    pub width: f64,
    pub height: f64,
    pub quantity: usize,
    pub allow_rotation: bool,
    pub tag: Option<String>,
    pub shape: PieceShape,
    pub material: Option<String>,
    pub thickness: Option<f64>,
}

impl Piece {
    /// Plain rectangular part, the common case.
    pub fn rect(id: impl Into<String>, width: f64, height: f64, quantity: usize) -> Self {
        Piece {
            id: id.into(),
            width,
            height,
            quantity,
            allow_rotation: true,
            tag: None,
            shape: PieceShape::Rect,
            material: None,
            thickness: None,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Outline in piece-local coordinates, bbox anchored at the origin.
    pub fn outline(&self) -> Vec<Point> {
        self.shape.outline(self.width, self.height)
    }
}

/// Outline classification of a piece within its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub enum PieceShape {
    /// Full-rectangle part.
    Rect,
    /// Circular part, `radius` is half the bounding box side.
    Circle { radius: f64 },
    /// Explicit outline in piece-local coordinates.
    Polygon { points: Vec<Point> },
    /// Imported outline too intricate for exact treatment; handled by its
    /// outline points with a bounding-rectangle fallback.
    Complex {
        points: Vec<Point>,
        source_ref: Option<String>,
    },
}

impl PieceShape {
    /// Outline of the shape in piece-local coordinates.
    ///
    /// Circles become a regular 16-gon centred at (r, r). Stored outlines
    /// are used as-is; an empty point list falls back to the bounding
    /// rectangle.
    pub fn outline(&self, width: f64, height: f64) -> Vec<Point> {
        match self {
            PieceShape::Rect => rect_outline(width, height),
            PieceShape::Circle { radius } => {
                let r = *radius;
                (0..CIRCLE_SEGMENTS)
                    .map(|i| {
                        let angle =
                            i as f64 * 2.0 * std::f64::consts::PI / CIRCLE_SEGMENTS as f64;
                        Point(r + r * angle.cos(), r + r * angle.sin())
                    })
                    .collect()
            }
            PieceShape::Polygon { points } | PieceShape::Complex { points, .. } => {
                if points.len() >= 3 {
                    points.clone()
                } else {
                    rect_outline(width, height)
                }
            }
        }
    }

    /// Nesting complexity, used to order pieces in the polygon engine.
    pub fn complexity(&self) -> f64 {
        match self {
            PieceShape::Rect => 1.0,
            PieceShape::Circle { .. } => 2.0,
            PieceShape::Polygon { points } => 3.0 + 0.1 * points.len() as f64,
            PieceShape::Complex { .. } => 5.0,
        }
    }

    /// Orientations worth trying for this shape.
    ///
    /// A 16-gon is 4-fold symmetric, so circles only ever need 0°.
    pub fn orientations(&self, allow_rotation: bool) -> &'static [Rotation] {
        if !allow_rotation {
            return &[Rotation::R0];
        }
        match self {
            PieceShape::Rect => &[Rotation::R0, Rotation::R90],
            PieceShape::Circle { .. } => &[Rotation::R0],
            PieceShape::Polygon { .. } | PieceShape::Complex { .. } => &[
                Rotation::R0,
                Rotation::R90,
                Rotation::R180,
                Rotation::R270,
            ],
        }
    }
}

fn rect_outline(width: f64, height: f64) -> Vec<Point> {
    vec![
        Point(0.0, 0.0),
        Point(width, 0.0),
        Point(width, height),
        Point(0.0, height),
    ]
}

/// A single unit to be placed, produced by expanding piece quantities.
///
/// `uid` is the unit's position in the expanded list and stays unique across
/// the run; ordering searches permute instances by value and never share
/// gene storage between candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceInstance {
    pub uid: usize,
    /// Index of the originating request in the submitted piece list.
    pub piece_id: usize,
    /// Pre-placement quarter turn applied by an ordering search. Engines
    /// still try the admissible orientations on top of this.
    pub flipped: bool,
}

impl PieceInstance {
    /// Bounding box dims of this unit, after any pre-placement flip.
    pub fn dims(&self, piece: &Piece) -> (f64, f64) {
        match self.flipped {
            true => (piece.height, piece.width),
            false => (piece.width, piece.height),
        }
    }
}

/// Expands piece quantities into placeable units, dropping pieces that fail
/// validation or cannot fit the sheet in any admissible orientation. One
/// warning is emitted per dropped piece.
pub fn expand_pieces(
    pieces: &[Piece],
    sheet: &SheetSpec,
) -> (Vec<PieceInstance>, Vec<PieceWarning>) {
    let mut instances = Vec::new();
    let mut warnings = Vec::new();

    for (piece_id, piece) in pieces.iter().enumerate() {
        if !(piece.width > 0.0 && piece.width.is_finite())
            || !(piece.height > 0.0 && piece.height.is_finite())
            || piece.quantity == 0
        {
            warn!(
                "[NEST] piece '{}' has invalid dimensions ({}x{}, qty {})",
                piece.id, piece.width, piece.height, piece.quantity
            );
            warnings.push(PieceWarning {
                piece_id,
                quantity: piece.quantity,
                kind: WarningKind::InvalidDimensions,
                detail: format!(
                    "width {}, height {}, quantity {}",
                    piece.width, piece.height, piece.quantity
                ),
            });
            continue;
        }

        let fits = piece.width <= sheet.width && piece.height <= sheet.height;
        let fits_rotated =
            piece.allow_rotation && piece.height <= sheet.width && piece.width <= sheet.height;
        if !fits && !fits_rotated {
            warn!(
                "[NEST] piece '{}' ({}x{}) exceeds the {}x{} sheet in every orientation",
                piece.id, piece.width, piece.height, sheet.width, sheet.height
            );
            warnings.push(PieceWarning {
                piece_id,
                quantity: piece.quantity,
                kind: WarningKind::TooLargeForSheet,
                detail: format!(
                    "{}x{} exceeds sheet {}x{}",
                    piece.width, piece.height, sheet.width, sheet.height
                ),
            });
            continue;
        }

        for _ in 0..piece.quantity {
            instances.push(PieceInstance {
                uid: instances.len(),
                piece_id,
                flipped: false,
            });
        }
    }

    (instances, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> SheetSpec {
        SheetSpec::try_new(500.0, 500.0, 2.0, 3.0, "steel").unwrap()
    }

    #[test]
    fn expansion_yields_one_instance_per_unit() {
        let pieces = vec![Piece::rect("a", 100.0, 50.0, 3), Piece::rect("b", 20.0, 20.0, 1)];
        let (instances, warnings) = expand_pieces(&pieces, &sheet());
        assert_eq!(instances.len(), 4);
        assert!(warnings.is_empty());
        assert_eq!(instances[2], PieceInstance { uid: 2, piece_id: 0, flipped: false });
        assert_eq!(instances[3].piece_id, 1);
    }

    #[test]
    fn invalid_dimensions_are_dropped_with_a_warning() {
        let pieces = vec![
            Piece::rect("ok", 10.0, 10.0, 1),
            Piece::rect("flat", 0.0, 10.0, 2),
            Piece::rect("none", 10.0, 10.0, 0),
        ];
        let (instances, warnings) = expand_pieces(&pieces, &sheet());
        assert_eq!(instances.len(), 1);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.kind == WarningKind::InvalidDimensions));
    }

    #[test]
    fn oversized_pieces_are_rejected_unless_rotation_saves_them() {
        let mut tall = Piece::rect("tall", 80.0, 600.0, 1);
        tall.allow_rotation = true;
        let mut rigid = Piece::rect("rigid", 80.0, 600.0, 1);
        rigid.allow_rotation = false;

        // 600 mm only fits along the 700 mm axis
        let sheet = SheetSpec::try_new(700.0, 500.0, 2.0, 3.0, "steel").unwrap();
        let (instances, warnings) = expand_pieces(&[tall, rigid], &sheet);
        assert_eq!(instances.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::TooLargeForSheet);
        assert_eq!(warnings[0].piece_id, 1);
    }

    #[test]
    fn circle_outline_is_a_sixteen_gon() {
        let shape = PieceShape::Circle { radius: 25.0 };
        let outline = shape.outline(50.0, 50.0);
        assert_eq!(outline.len(), CIRCLE_SEGMENTS);
        assert_eq!(outline[0], Point(50.0, 25.0));
        for p in &outline {
            assert!(p.0 >= 0.0 && p.0 <= 50.0 && p.1 >= 0.0 && p.1 <= 50.0);
        }
    }

    #[test]
    fn empty_outline_falls_back_to_the_bounding_rect() {
        let shape = PieceShape::Complex { points: vec![], source_ref: None };
        let outline = shape.outline(30.0, 20.0);
        assert_eq!(outline, vec![Point(0.0, 0.0), Point(30.0, 0.0), Point(30.0, 20.0), Point(0.0, 20.0)]);
    }

    #[test]
    fn complexity_ranks_shapes() {
        let poly = PieceShape::Polygon { points: vec![Point(0.0, 0.0); 8] };
        assert!(PieceShape::Rect.complexity() < PieceShape::Circle { radius: 1.0 }.complexity());
        assert!((poly.complexity() - 3.8).abs() < 1e-9);
        let complex = PieceShape::Complex { points: vec![], source_ref: None };
        assert!(complex.complexity() > poly.complexity());
    }
}
