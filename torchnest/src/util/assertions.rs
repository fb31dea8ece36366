use itertools::Itertools;
use log::error;

use crate::entities::{NestSolution, Piece, Rotation, SheetResult, SheetSpec, WarningKind};

//Various checks to verify the correctness of placement results.
//Used in debug_assert!() blocks and tests.

/// Every placement lies inside the sheet boundary.
pub fn placements_in_bounds(sheet: &SheetResult, spec: &SheetSpec) -> bool {
    let boundary = spec.rect();
    for p in &sheet.placed {
        if !boundary.contains(&p.rect()) {
            error!(
                "placement of piece {} at ({}, {}) leaves the sheet",
                p.piece_id, p.x, p.y
            );
            return false;
        }
    }
    true
}

/// No two kerf-expanded placement boxes on the sheet cut into each other.
pub fn kerf_separation_respected(sheet: &SheetResult, spec: &SheetSpec) -> bool {
    let margin = spec.kerf / 2.0;
    for (a, b) in sheet.placed.iter().tuple_combinations() {
        let (ra, rb) = (a.rect().inflate(margin), b.rect().inflate(margin));
        if ra.overlaps_interior(&rb) {
            error!(
                "pieces {} and {} are closer than the kerf allows",
                a.piece_id, b.piece_id
            );
            return false;
        }
    }
    true
}

/// Placed plus rejected unit counts equal the requested quantities.
pub fn quantities_conserved(pieces: &[Piece], solution: &NestSolution) -> bool {
    let mut accounted = vec![0usize; pieces.len()];
    for sheet in &solution.sheets {
        for p in &sheet.placed {
            accounted[p.piece_id] += 1;
        }
    }
    for w in &solution.warnings {
        accounted[w.piece_id] += w.quantity;
    }
    for (piece_id, piece) in pieces.iter().enumerate() {
        if accounted[piece_id] != piece.quantity {
            error!(
                "piece {} requested {} units but {} are accounted for",
                piece_id, piece.quantity, accounted[piece_id]
            );
            return false;
        }
    }
    true
}

/// Pieces that forbid rotation kept their original footprint.
pub fn rotation_constraint_respected(pieces: &[Piece], solution: &NestSolution) -> bool {
    for sheet in &solution.sheets {
        for p in &sheet.placed {
            let piece = &pieces[p.piece_id];
            if piece.allow_rotation {
                continue;
            }
            if p.rotation != Rotation::R0 || p.width != piece.width || p.height != piece.height {
                error!(
                    "piece {} forbids rotation but was placed at {}° as {}x{}",
                    p.piece_id,
                    p.rotation.degrees(),
                    p.width,
                    p.height
                );
                return false;
            }
        }
    }
    true
}

/// Warnings only ever cite pieces from the request list, and feasibility
/// warnings never coincide with a placement of the same unit count.
pub fn warnings_are_plausible(pieces: &[Piece], solution: &NestSolution) -> bool {
    solution.warnings.iter().all(|w| {
        w.piece_id < pieces.len()
            && w.quantity > 0
            && (w.kind != WarningKind::InvalidDimensions || w.quantity == pieces[w.piece_id].quantity)
    })
}
