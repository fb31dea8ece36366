use std::cmp::Reverse;
use std::time::Instant;

use itertools::Itertools;
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use thousands::Separable;

use crate::entities::{
    NestProblem, NestSolution, Piece, PieceInstance, PieceShape, PieceWarning, PlacedPiece,
    Rotation, SheetKey, SheetLayout, SheetSpec, WarningKind, expand_pieces,
};
use crate::geometry::geo_traits::CollidesWith;
use crate::geometry::nfp::{minkowski_nfp, rect_nfp};
use crate::geometry::primitives::{Point, Polygon, Rect};
use crate::util::{CancelToken, assertions};

/// Grid pitch for candidate positions, adapted to the piece size.
pub fn grid_step(width: f64, height: f64) -> f64 {
    (width.min(height) / 10.0).max(5.0)
}

/// Placement engine for non-rectangular outlines.
///
/// Candidate positions are tested against the no-fit region each placed
/// piece casts for the candidate outline instead of against bounding boxes,
/// so concave parts can nest inside each other's slack. Rectangle pairs
/// still take the closed-form fast path.
pub struct NfpNester<'a> {
    pub pieces: &'a [Piece],
    pub spec: SheetSpec,
    pub cancel: CancelToken,
    /// Number of candidate positions tested so far.
    pub candidates_tested: usize,
}

impl<'a> NfpNester<'a> {
    pub fn new(pieces: &'a [Piece], spec: SheetSpec) -> Self {
        Self::with_cancel(pieces, spec, CancelToken::new())
    }

    pub fn with_cancel(pieces: &'a [Piece], spec: SheetSpec, cancel: CancelToken) -> Self {
        Self {
            pieces,
            spec,
            cancel,
            candidates_tested: 0,
        }
    }

    /// Expands quantities, orders units by descending shape complexity then
    /// area, and places them all.
    pub fn solve(&mut self) -> NestSolution {
        let start = Instant::now();
        let (instances, warnings) = expand_pieces(self.pieces, &self.spec);
        let ordered: Vec<PieceInstance> = instances
            .iter()
            .copied()
            .sorted_by_cached_key(|inst| {
                let piece = &self.pieces[inst.piece_id];
                (
                    Reverse(OrderedFloat(piece.shape.complexity())),
                    Reverse(OrderedFloat(piece.area())),
                )
            })
            .collect();
        let mut warnings = warnings;

        let mut problem = NestProblem::new(self.spec.clone());
        'units: for inst in &ordered {
            if self.cancel.is_cancelled() {
                debug!(
                    "[NFP] cancelled, finalizing with {} sheets",
                    problem.sheet_count()
                );
                break 'units;
            }
            let piece = &self.pieces[inst.piece_id];

            for key in problem.keys() {
                if let Some(pos) = self.best_position(problem.layout(key), piece) {
                    place_at(&mut problem, key, inst, piece, pos);
                    continue 'units;
                }
            }

            let key = problem.open_sheet();
            match self.best_position(problem.layout(key), piece) {
                Some(pos) => {
                    debug!(
                        "[NFP] opened sheet {} for unit {} of '{}'",
                        problem.sheet_count(),
                        inst.uid,
                        piece.id
                    );
                    place_at(&mut problem, key, inst, piece, pos);
                }
                None => {
                    problem.close_sheet(key);
                    if self.cancel.is_cancelled() {
                        break 'units;
                    }
                    warn!(
                        "[NFP] no feasible position for unit {} of '{}' on an empty sheet",
                        inst.uid, piece.id
                    );
                    warnings.push(PieceWarning {
                        piece_id: inst.piece_id,
                        quantity: 1,
                        kind: WarningKind::NoFeasiblePlacement,
                        detail: format!("unit {} found no position on an empty sheet", inst.uid),
                    });
                }
            }
        }

        let solution = NestSolution::from_problem(&problem, warnings);
        info!(
            "[NFP] placed {}/{} units on {} sheets in {:.3}ms ({} candidates tested)",
            solution.placed_count(),
            instances.len(),
            solution.sheet_count(),
            start.elapsed().as_secs_f64() * 1000.0,
            self.candidates_tested.separate_with_commas()
        );
        debug_assert!(
            solution
                .sheets
                .iter()
                .all(|s| assertions::placements_in_bounds(s, &self.spec))
        );
        debug_assert!(assertions::rotation_constraint_respected(
            self.pieces,
            &solution
        ));
        debug_assert!(
            self.cancel.is_cancelled() || assertions::quantities_conserved(self.pieces, &solution)
        );
        solution
    }

    /// Best position over the shape's admissible orientations on this sheet.
    /// Lower `y * sheet_width + x` wins, earlier orientations win ties.
    fn best_position(&mut self, layout: &SheetLayout, piece: &Piece) -> Option<NfpPosition> {
        let mut best: Option<NfpPosition> = None;
        for &rotation in piece.shape.orientations(piece.allow_rotation) {
            let cand = orient(piece, rotation);
            if let Some((x, y)) = self.scan(layout, &cand) {
                let score = y * layout.spec().width + x;
                if best.as_ref().is_none_or(|b| score < b.score) {
                    best = Some(NfpPosition { x, y, score, cand });
                }
            }
        }
        best
    }

    /// Scans the candidate grid bottom-up and returns the first position
    /// outside every no-fit region, which is the best one for this
    /// orientation.
    fn scan(&mut self, layout: &SheetLayout, cand: &Oriented) -> Option<(f64, f64)> {
        let spec = layout.spec();
        let x_span = spec.width - cand.width;
        let y_span = spec.height - cand.height;
        if x_span < 0.0 || y_span < 0.0 {
            return None;
        }
        let step = grid_step(cand.width, cand.height);
        let regions = self.regions(layout, cand);

        let mut y = 0.0;
        while y <= y_span {
            if self.cancel.is_cancelled() {
                return None;
            }
            let mut x = 0.0;
            while x <= x_span {
                self.candidates_tested += 1;
                let position = Point(x, y);
                if !regions.iter().any(|r| r.blocks(position)) {
                    return Some((x, y));
                }
                x += step;
            }
            y += step;
        }
        None
    }

    /// No-fit regions every placed piece casts for the candidate outline.
    /// The regions depend only on the candidate's orientation, so they are
    /// computed once per scan rather than once per grid position.
    fn regions(&self, layout: &SheetLayout, cand: &Oriented) -> Vec<NfpRegion> {
        layout
            .placed_with_outlines()
            .map(|(placed, fixed_outline)| self.region_for(placed, fixed_outline, cand))
            .collect()
    }

    fn region_for(
        &self,
        placed: &PlacedPiece,
        fixed_outline: Option<&Polygon>,
        cand: &Oriented,
    ) -> NfpRegion {
        match (fixed_outline, &cand.outline) {
            (None, None) => NfpRegion::Fast(rect_nfp(
                &placed.rect(),
                cand.width,
                cand.height,
                self.spec.kerf,
            )),
            (fixed, moving) => {
                let fixed_points: Vec<Point> = match fixed {
                    Some(polygon) => polygon.points.clone(),
                    None => placed.rect().corners().to_vec(),
                };
                let moving_points: Vec<Point> = match moving {
                    Some(polygon) => polygon.points.clone(),
                    None => Rect::from_dims(0.0, 0.0, cand.width, cand.height)
                        .corners()
                        .to_vec(),
                };
                match minkowski_nfp(&fixed_points, &moving_points) {
                    Some(hull) => NfpRegion::Hull(hull),
                    None => NfpRegion::Degenerate,
                }
            }
        }
    }
}

/// Exclusion region one placed piece casts for a candidate outline.
enum NfpRegion {
    /// Rectangle pair, closed-form box.
    Fast(Rect),
    /// General pair, convex hull of the Minkowski sum.
    Hull(Polygon),
    /// Collapsed hull, treated as always blocking.
    Degenerate,
}

impl NfpRegion {
    fn blocks(&self, position: Point) -> bool {
        match self {
            NfpRegion::Fast(rect) => rect.contains_interior(position),
            NfpRegion::Hull(hull) => hull.collides_with(&position),
            NfpRegion::Degenerate => true,
        }
    }
}

/// A candidate piece in one concrete orientation. `outline` is `None` for
/// plain rectangles, which never need the hull machinery.
struct Oriented {
    rotation: Rotation,
    width: f64,
    height: f64,
    outline: Option<Polygon>,
}

fn orient(piece: &Piece, rotation: Rotation) -> Oriented {
    let (width, height) = match rotation.swaps_dims() {
        true => (piece.height, piece.width),
        false => (piece.width, piece.height),
    };
    let outline = match &piece.shape {
        PieceShape::Rect => None,
        _ => match Polygon::try_new(rotation.apply(&piece.outline())) {
            Ok(polygon) => Some(polygon),
            Err(_) => {
                warn!(
                    "[NFP] outline of '{}' is degenerate, using its bounding box",
                    piece.id
                );
                None
            }
        },
    };
    Oriented {
        rotation,
        width,
        height,
        outline,
    }
}

struct NfpPosition {
    x: f64,
    y: f64,
    score: f64,
    cand: Oriented,
}

fn place_at(
    problem: &mut NestProblem,
    key: SheetKey,
    inst: &PieceInstance,
    piece: &Piece,
    pos: NfpPosition,
) {
    debug!(
        "[NFP] placing unit {} of '{}' at ({}, {}) rot {}",
        inst.uid,
        piece.id,
        pos.x,
        pos.y,
        pos.cand.rotation.degrees()
    );
    let outline = pos.cand.outline.map(|p| p.translated(pos.x, pos.y));
    let placed = PlacedPiece {
        piece_id: inst.piece_id,
        x: pos.x,
        y: pos.y,
        width: pos.cand.width,
        height: pos.cand.height,
        rotation: pos.cand.rotation,
        tag: piece.tag.clone(),
    };
    problem.layout_mut(key).place(placed, outline);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> SheetSpec {
        SheetSpec::try_new(500.0, 500.0, 4.0, 3.0, "steel").unwrap()
    }

    fn triangle_piece(quantity: usize) -> Piece {
        Piece {
            shape: PieceShape::Polygon {
                points: vec![Point(0.0, 0.0), Point(100.0, 0.0), Point(0.0, 100.0)],
            },
            ..Piece::rect("tri", 100.0, 100.0, quantity)
        }
    }

    #[test]
    fn rectangle_pairs_take_the_closed_form_path() {
        let pieces = vec![Piece::rect("r", 100.0, 50.0, 2)];
        let solution = NfpNester::new(&pieces, sheet()).solve();

        assert_eq!(solution.sheet_count(), 1);
        let placed = &solution.sheets[0].placed;
        assert_eq!((placed[0].x, placed[0].y), (0.0, 0.0));
        // first 5 mm grid position past the 102 mm no-fit edge
        assert_eq!((placed[1].x, placed[1].y), (105.0, 0.0));
    }

    #[test]
    fn complementary_triangles_tile_one_square() {
        let pieces = vec![triangle_piece(2)];
        let solution = NfpNester::new(&pieces, sheet()).solve();

        assert_eq!(solution.sheet_count(), 1);
        assert_eq!(solution.placed_count(), 2);
        let placed = &solution.sheets[0].placed;
        assert_eq!((placed[0].x, placed[0].y), (0.0, 0.0));
        assert_eq!(placed[0].rotation, Rotation::R0);
        // the half-turned copy fills the hypotenuse slack, something a
        // bounding box test could never admit
        assert_eq!((placed[1].x, placed[1].y), (0.0, 0.0));
        assert_eq!(placed[1].rotation, Rotation::R180);
    }

    #[test]
    fn harder_shapes_are_placed_before_larger_rectangles() {
        let circle = Piece {
            shape: PieceShape::Circle { radius: 25.0 },
            ..Piece::rect("disc", 50.0, 50.0, 1)
        };
        let pieces = vec![Piece::rect("plate", 200.0, 100.0, 1), circle];
        let solution = NfpNester::new(&pieces, sheet()).solve();

        assert_eq!(solution.placed_count(), 2);
        assert_eq!(solution.sheets[0].placed[0].piece_id, 1);
    }

    #[test]
    fn collinear_outline_falls_back_to_its_bounding_box() {
        let sliver = Piece {
            shape: PieceShape::Complex {
                points: vec![Point(0.0, 0.0), Point(50.0, 50.0), Point(100.0, 100.0)],
                source_ref: None,
            },
            ..Piece::rect("sliver", 100.0, 100.0, 1)
        };
        let solution = NfpNester::new(&[sliver], sheet()).solve();

        assert_eq!(solution.placed_count(), 1);
        assert_eq!(
            (solution.sheets[0].placed[0].x, solution.sheets[0].placed[0].y),
            (0.0, 0.0)
        );
    }

    #[test]
    fn oversized_polygon_is_rejected_with_a_warning() {
        let pieces = vec![Piece {
            shape: PieceShape::Polygon {
                points: vec![Point(0.0, 0.0), Point(600.0, 0.0), Point(0.0, 600.0)],
            },
            ..Piece::rect("huge", 600.0, 600.0, 1)
        }];
        let solution = NfpNester::new(&pieces, sheet()).solve();

        assert_eq!(solution.sheet_count(), 0);
        assert_eq!(solution.warnings.len(), 1);
        assert_eq!(solution.warnings[0].kind, WarningKind::TooLargeForSheet);
    }
}
