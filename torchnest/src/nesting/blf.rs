use std::cmp::Reverse;
use std::time::Instant;

use itertools::Itertools;
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use thousands::Separable;

use crate::entities::{
    NestProblem, NestSolution, Piece, PieceInstance, PieceWarning, PlacedPiece, Rotation,
    SheetLayout, SheetSpec, WarningKind, expand_pieces,
};
use crate::geometry::primitives::Rect;
use crate::util::{CancelToken, assertions};

/// Bottom-left-fill engine: places units at the lowest, then leftmost,
/// admissible position on a 1 mm candidate grid, opening a new sheet
/// whenever none of the open sheets can take the unit.
pub struct BlfNester<'a> {
    pub pieces: &'a [Piece],
    pub spec: SheetSpec,
    pub cancel: CancelToken,
    /// Number of candidate positions tested so far.
    pub candidates_tested: usize,
}

impl<'a> BlfNester<'a> {
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

    /// Expands quantities, orders units by descending bounding box area and
    /// places them all.
    pub fn solve(&mut self) -> NestSolution {
        let start = Instant::now();
        let (instances, warnings) = expand_pieces(self.pieces, &self.spec);
        let ordered = area_descending(self.pieces, &instances);
        let solution = self.place_ordered(&ordered, warnings);
        debug_assert!(
            self.cancel.is_cancelled() || assertions::quantities_conserved(self.pieces, &solution)
        );
        debug_assert!(assertions::rotation_constraint_respected(
            self.pieces,
            &solution
        ));
        info!(
            "[BLF] placed {}/{} units on {} sheets in {:.3}ms ({} candidates tested)",
            solution.placed_count(),
            instances.len(),
            solution.sheet_count(),
            start.elapsed().as_secs_f64() * 1000.0,
            self.candidates_tested.separate_with_commas()
        );
        solution
    }

    /// Places units in exactly the given order, first fitting sheet wins.
    /// Ordering searches call this directly with their own sequences.
    pub fn place_ordered(
        &mut self,
        instances: &[PieceInstance],
        warnings: Vec<PieceWarning>,
    ) -> NestSolution {
        let mut problem = NestProblem::new(self.spec.clone());
        let mut warnings = warnings;

        'units: for inst in instances {
            if self.cancel.is_cancelled() {
                debug!(
                    "[BLF] cancelled, finalizing with {} sheets",
                    problem.sheet_count()
                );
                break 'units;
            }
            let piece = &self.pieces[inst.piece_id];
            let (width, height) = inst.dims(piece);

            for key in problem.keys() {
                if let Some(pos) =
                    self.best_position(problem.layout(key), width, height, piece.allow_rotation)
                {
                    let placed = to_placed(inst, piece, &pos);
                    debug!(
                        "[BLF] placing unit {} of '{}' at ({}, {})",
                        inst.uid, piece.id, placed.x, placed.y
                    );
                    problem.layout_mut(key).place(placed, None);
                    continue 'units;
                }
            }

            // none of the open sheets can take the unit
            let key = problem.open_sheet();
            match self.best_position(problem.layout(key), width, height, piece.allow_rotation) {
                Some(pos) => {
                    let placed = to_placed(inst, piece, &pos);
                    debug!(
                        "[BLF] opened sheet {} for unit {} of '{}'",
                        problem.sheet_count(),
                        inst.uid,
                        piece.id
                    );
                    problem.layout_mut(key).place(placed, None);
                }
                None => {
                    problem.close_sheet(key);
                    if self.cancel.is_cancelled() {
                        break 'units;
                    }
                    warn!(
                        "[BLF] no feasible position for unit {} of '{}' on an empty sheet",
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
        debug_assert!(
            solution
                .sheets
                .iter()
                .all(|s| assertions::placements_in_bounds(s, &self.spec))
        );
        debug_assert!(
            solution
                .sheets
                .iter()
                .all(|s| assertions::kerf_separation_respected(s, &self.spec))
        );
        solution
    }

    /// Best position over the admissible orientations of a unit on this
    /// sheet. Lower `y * sheet_width + x` wins, 0° wins ties.
    fn best_position(
        &mut self,
        layout: &SheetLayout,
        width: f64,
        height: f64,
        allow_rotation: bool,
    ) -> Option<BlfPosition> {
        let mut orientations = vec![(width, height)];
        if allow_rotation && width != height {
            orientations.push((height, width));
        }

        let mut best: Option<BlfPosition> = None;
        for (w, h) in orientations {
            if let Some((x, y)) = self.scan_rows(layout, w, h) {
                let score = y * layout.spec().width + x;
                if best.as_ref().is_none_or(|b| score < b.score) {
                    best = Some(BlfPosition {
                        x,
                        y,
                        width: w,
                        height: h,
                        score,
                    });
                }
            }
        }
        best
    }

    /// Scans candidate rows bottom-up on a 1 mm grid and returns the first
    /// admissible position, which by construction is the best one for this
    /// orientation. Within a row the scan jumps past the obstruction
    /// instead of stepping millimetre by millimetre, which leaves the
    /// chosen positions unchanged.
    fn scan_rows(&mut self, layout: &SheetLayout, width: f64, height: f64) -> Option<(f64, f64)> {
        let spec = layout.spec();
        let x_span = spec.width - width;
        let y_span = spec.height - height;
        if x_span < 0.0 || y_span < 0.0 {
            return None;
        }
        let margin = spec.kerf / 2.0;

        for row in 0..=(y_span as i64) {
            if self.cancel.is_cancelled() {
                return None;
            }
            let y = row as f64;
            let mut x = 0.0;
            while x <= x_span {
                self.candidates_tested += 1;
                let inflated = Rect::from_dims(x, y, width, height).inflate(margin);
                match layout.blocking_edge(&inflated) {
                    None => return Some((x, y)),
                    Some(edge) => {
                        // every position left of the cleared edge collides
                        // with the same box
                        let next = (edge + margin).ceil();
                        x = next.max(x + 1.0);
                    }
                }
            }
        }
        None
    }
}

struct BlfPosition {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    score: f64,
}

fn to_placed(inst: &PieceInstance, piece: &Piece, pos: &BlfPosition) -> PlacedPiece {
    // orientation relative to the original footprint, regardless of which
    // combination of pre-flip and in-engine turn produced it
    let rotation = match pos.width == piece.width && pos.height == piece.height {
        true => Rotation::R0,
        false => Rotation::R90,
    };
    PlacedPiece {
        piece_id: inst.piece_id,
        x: pos.x,
        y: pos.y,
        width: pos.width,
        height: pos.height,
        rotation,
        tag: piece.tag.clone(),
    }
}

/// Units ordered by descending bounding box area, stable for equal areas.
pub fn area_descending(pieces: &[Piece], instances: &[PieceInstance]) -> Vec<PieceInstance> {
    instances
        .iter()
        .copied()
        .sorted_by_cached_key(|inst| Reverse(OrderedFloat(pieces[inst.piece_id].area())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_500() -> SheetSpec {
        SheetSpec::try_new(500.0, 500.0, 2.0, 3.0, "steel").unwrap()
    }

    #[test]
    fn two_squares_share_one_sheet() {
        let pieces = vec![Piece::rect("sq", 100.0, 100.0, 2)];
        let solution = BlfNester::new(&pieces, sheet_500()).solve();

        assert_eq!(solution.sheet_count(), 1);
        assert_eq!(solution.placed_count(), 2);
        assert!(solution.warnings.is_empty());
        assert!((solution.sheets[0].efficiency - 8.0).abs() < 1e-9);

        let placed = &solution.sheets[0].placed;
        assert_eq!((placed[0].x, placed[0].y), (0.0, 0.0));
        // 100 mm piece plus 2 mm kerf
        assert_eq!((placed[1].x, placed[1].y), (102.0, 0.0));
    }

    #[test]
    fn full_rows_promote_to_the_next_row() {
        let spec = SheetSpec::try_new(210.0, 500.0, 2.0, 3.0, "steel").unwrap();
        let pieces = vec![Piece::rect("sq", 100.0, 100.0, 3)];
        let solution = BlfNester::new(&pieces, spec).solve();

        let placed = &solution.sheets[0].placed;
        assert_eq!(solution.sheet_count(), 1);
        assert_eq!((placed[0].x, placed[0].y), (0.0, 0.0));
        assert_eq!((placed[1].x, placed[1].y), (102.0, 0.0));
        assert_eq!((placed[2].x, placed[2].y), (0.0, 102.0));
    }

    #[test]
    fn oversized_piece_yields_a_warning_not_an_error() {
        let pieces = vec![Piece::rect("big", 600.0, 600.0, 1)];
        let solution = BlfNester::new(&pieces, sheet_500()).solve();

        assert_eq!(solution.sheet_count(), 0);
        assert_eq!(solution.placed_count(), 0);
        assert_eq!(solution.warnings.len(), 1);
        assert_eq!(solution.warnings[0].kind, WarningKind::TooLargeForSheet);
    }

    #[test]
    fn rotation_rescues_a_tall_piece() {
        let spec = SheetSpec::try_new(130.0, 60.0, 2.0, 3.0, "steel").unwrap();
        let pieces = vec![Piece::rect("tall", 50.0, 120.0, 1)];
        let solution = BlfNester::new(&pieces, spec).solve();

        assert_eq!(solution.placed_count(), 1);
        let placed = &solution.sheets[0].placed[0];
        assert_eq!(placed.rotation, Rotation::R90);
        assert_eq!((placed.width, placed.height), (120.0, 50.0));
    }

    #[test]
    fn denied_rotation_is_respected() {
        let spec = SheetSpec::try_new(130.0, 60.0, 2.0, 3.0, "steel").unwrap();
        let mut piece = Piece::rect("tall", 50.0, 120.0, 1);
        piece.allow_rotation = false;
        let pieces = vec![piece];
        let solution = BlfNester::new(&pieces, spec).solve();

        assert_eq!(solution.placed_count(), 0);
        assert_eq!(solution.warnings[0].kind, WarningKind::TooLargeForSheet);
    }

    #[test]
    fn larger_pieces_are_placed_first() {
        let pieces = vec![
            Piece::rect("small", 20.0, 20.0, 1),
            Piece::rect("large", 200.0, 200.0, 1),
        ];
        let solution = BlfNester::new(&pieces, sheet_500()).solve();

        let placed = &solution.sheets[0].placed;
        assert_eq!(placed[0].piece_id, 1);
        assert_eq!(placed[1].piece_id, 0);
    }

    #[test]
    fn cancelled_solve_returns_a_partial_result() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let pieces = vec![Piece::rect("sq", 100.0, 100.0, 4)];
        let solution = BlfNester::with_cancel(&pieces, sheet_500(), cancel).solve();

        assert_eq!(solution.placed_count(), 0);
        assert_eq!(solution.sheet_count(), 0);
    }
}
