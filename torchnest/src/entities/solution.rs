use crate::entities::layout::NestProblem;
use crate::entities::placed_piece::PlacedPiece;
use crate::entities::sheet::cost_per_kg_of;

/// Non-fatal defect reported alongside a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Width, height or quantity failed validation.
    InvalidDimensions,
    /// The piece exceeds the sheet in every admissible orientation.
    TooLargeForSheet,
    /// The piece fits the sheet in isolation, yet no legal position was
    /// found even on a freshly opened sheet.
    NoFeasiblePlacement,
}

impl WarningKind {
    pub fn label(&self) -> &'static str {
        match self {
            WarningKind::InvalidDimensions => "invalid_dimensions",
            WarningKind::TooLargeForSheet => "too_large_for_sheet",
            WarningKind::NoFeasiblePlacement => "no_feasible_placement",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PieceWarning {
    /// Index of the affected request in the submitted piece list.
    pub piece_id: usize,
    /// Number of units affected.
    pub quantity: usize,
    pub kind: WarningKind,
    pub detail: String,
}

/// Snapshot of one filled sheet.
#[derive(Debug, Clone)]
pub struct SheetResult {
    /// Zero-based sheet number in opening order.
    pub index: usize,
    /// Placements in the order they were made.
    pub placed: Vec<PlacedPiece>,
    /// Percentage of the sheet area covered by placed bounding boxes.
    pub efficiency: f64,
    pub utilized_area: f64,
    pub waste_area: f64,
    /// Weight of the full stock sheet in kg.
    pub weight_kg: f64,
}

/// Aggregate outcome of a nesting run.
#[derive(Debug, Clone, Default)]
pub struct NestSolution {
    pub sheets: Vec<SheetResult>,
    pub total_waste_area: f64,
    /// Mean sheet efficiency in percent, 0 when no sheet was opened.
    pub average_efficiency: f64,
    pub total_weight_kg: f64,
    /// Total weight priced at the sheet material's cost per kg.
    pub material_cost: f64,
    pub warnings: Vec<PieceWarning>,
}

impl NestSolution {
    /// Result of a run that placed nothing, e.g. for an empty piece list.
    pub fn empty(warnings: Vec<PieceWarning>) -> Self {
        NestSolution {
            warnings,
            ..NestSolution::default()
        }
    }

    /// Snapshots a finished problem state into per-sheet stats and totals.
    pub fn from_problem(problem: &NestProblem, warnings: Vec<PieceWarning>) -> Self {
        let spec = &problem.spec;
        let sheet_area = spec.area();
        let sheet_weight = spec.weight_kg();

        let sheets: Vec<SheetResult> = problem
            .sheets()
            .enumerate()
            .map(|(index, layout)| {
                let utilized_area = layout.utilized_area();
                SheetResult {
                    index,
                    placed: layout.placed().to_vec(),
                    efficiency: utilized_area / sheet_area * 100.0,
                    utilized_area,
                    waste_area: sheet_area - utilized_area,
                    weight_kg: sheet_weight,
                }
            })
            .collect();

        let total_waste_area = sheets.iter().map(|s| s.waste_area).sum();
        let average_efficiency = match sheets.is_empty() {
            true => 0.0,
            false => sheets.iter().map(|s| s.efficiency).sum::<f64>() / sheets.len() as f64,
        };
        let total_weight_kg: f64 = sheets.iter().map(|s| s.weight_kg).sum();
        let material_cost = total_weight_kg * cost_per_kg_of(&spec.material);

        NestSolution {
            sheets,
            total_waste_area,
            average_efficiency,
            total_weight_kg,
            material_cost,
            warnings,
        }
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn placed_count(&self) -> usize {
        self.sheets.iter().map(|s| s.placed.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::placed_piece::{PlacedPiece, Rotation};
    use crate::entities::sheet::SheetSpec;

    #[test]
    fn stats_are_aggregated_per_sheet_and_in_total() {
        let spec = SheetSpec::try_new(500.0, 500.0, 2.0, 4.0, "steel").unwrap();
        let mut problem = NestProblem::new(spec);
        let key = problem.open_sheet();
        for x in [0.0, 102.0] {
            problem.layout_mut(key).place(
                PlacedPiece {
                    piece_id: 0,
                    x,
                    y: 0.0,
                    width: 100.0,
                    height: 100.0,
                    rotation: Rotation::R0,
                    tag: None,
                },
                None,
            );
        }

        let solution = NestSolution::from_problem(&problem, vec![]);
        assert_eq!(solution.sheet_count(), 1);
        assert_eq!(solution.placed_count(), 2);
        assert!((solution.sheets[0].utilized_area - 20_000.0).abs() < 1e-9);
        assert!((solution.sheets[0].efficiency - 8.0).abs() < 1e-9);
        assert!((solution.total_waste_area - 230_000.0).abs() < 1e-9);
        // 0.25 m² * 4 mm steel
        assert!((solution.total_weight_kg - 0.785).abs() < 1e-9);
        assert!((solution.material_cost - 0.785 * 1.20).abs() < 1e-9);
    }

    #[test]
    fn empty_solution_has_zeroed_totals() {
        let solution = NestSolution::empty(vec![]);
        assert_eq!(solution.sheet_count(), 0);
        assert_eq!(solution.average_efficiency, 0.0);
        assert_eq!(solution.material_cost, 0.0);
    }
}
