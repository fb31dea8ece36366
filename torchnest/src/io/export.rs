use crate::cutpath::CutPlan;
use crate::entities::{Piece, PieceWarning, SheetResult};
use crate::io::ext_repr::{
    ExtCutPlan, ExtCutPoint, ExtPlacement, ExtSheetResult, ExtSolution, ExtWarning,
};
use crate::solver::OptimizationResult;

/// Exports a finished run to its external representation. Piece indices are
/// resolved back to the submitted identifiers.
pub fn export_solution(pieces: &[Piece], result: &OptimizationResult) -> ExtSolution {
    let solution = &result.solution;
    ExtSolution {
        sheets: solution
            .sheets
            .iter()
            .map(|sheet| export_sheet(pieces, sheet))
            .collect(),
        total_sheets: solution.sheet_count(),
        total_waste_area: solution.total_waste_area,
        average_efficiency: solution.average_efficiency,
        total_weight_kg: solution.total_weight_kg,
        material_cost: solution.material_cost,
        warnings: solution
            .warnings
            .iter()
            .map(|warning| export_warning(pieces, warning))
            .collect(),
        cut_plans: result.cut_plans.iter().map(export_cut_plan).collect(),
    }
}

fn export_sheet(pieces: &[Piece], sheet: &SheetResult) -> ExtSheetResult {
    ExtSheetResult {
        index: sheet.index,
        efficiency: sheet.efficiency,
        utilized_area: sheet.utilized_area,
        waste_area: sheet.waste_area,
        weight_kg: sheet.weight_kg,
        placements: sheet
            .placed
            .iter()
            .map(|placed| ExtPlacement {
                piece_id: piece_label(pieces, placed.piece_id),
                x: placed.x,
                y: placed.y,
                width: placed.width,
                height: placed.height,
                rotation: placed.rotation.degrees(),
                tag: placed.tag.clone(),
            })
            .collect(),
    }
}

fn export_warning(pieces: &[Piece], warning: &PieceWarning) -> ExtWarning {
    ExtWarning {
        piece: piece_label(pieces, warning.piece_id),
        kind: warning.kind.label().into(),
        quantity: warning.quantity,
        detail: warning.detail.clone(),
    }
}

fn export_cut_plan(plan: &CutPlan) -> ExtCutPlan {
    ExtCutPlan {
        sheet_index: plan.sheet_index,
        total_distance: plan.path.total_distance,
        pierce_count: plan.path.pierce_count,
        points: plan
            .path
            .points
            .iter()
            .map(|point| ExtCutPoint {
                x: point.x,
                y: point.y,
                piece: point.piece,
                kind: point.kind.label().into(),
            })
            .collect(),
        program: plan.program.clone(),
    }
}

fn piece_label(pieces: &[Piece], piece_id: usize) -> String {
    pieces
        .get(piece_id)
        .map(|p| p.id.clone())
        .unwrap_or_else(|| format!("#{piece_id}"))
}
