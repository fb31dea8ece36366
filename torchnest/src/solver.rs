use std::time::{Duration, Instant};

use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::cutpath::{CutPlan, CutProcess, THERMAL_RADIUS, emit_program, plan, plan_thermal};
use crate::entities::{NestSolution, Piece, SheetSpec};
use crate::geometry::geo_traits::DistanceTo;
use crate::nesting::{BlfNester, GeneticConfig, GeneticNester, NfpNester};
use crate::util::CancelToken;

/// Above this many units a hybrid run spends time on the genetic search as
/// well; below it the greedy layout is already as good as it gets.
pub const GA_UNIT_THRESHOLD: usize = 10;

/// Default kerf perturbation of the sensitivity analysis, in mm.
pub const DEFAULT_KERF_DELTA: f64 = 0.5;
/// Default sheet dimension perturbation of the sensitivity analysis, in mm.
pub const DEFAULT_SIZE_DELTA: f64 = 10.0;

/// Strategy used to produce a layout.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Blf,
    Genetic,
    Nfp,
    #[default]
    Hybrid,
}

/// Relative importance of the layout objectives in hybrid scoring.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct ObjectiveWeights {
    pub efficiency: f64,
    pub waste_reduction: f64,
    pub cutting_time: f64,
    /// Enables the thermal spread objective when set.
    pub thermal_distortion: Option<f64>,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        ObjectiveWeights {
            efficiency: 0.5,
            waste_reduction: 0.3,
            cutting_time: 0.2,
            thermal_distortion: None,
        }
    }
}

/// Top-level optimization settings, deserializable from the config file the
/// CLI accepts.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    pub algorithm: Algorithm,
    pub weights: ObjectiveWeights,
    pub genetic: GeneticConfig,
    pub process: CutProcess,
    /// Orders cuts by heat region instead of pure travel length.
    pub thermal_sequencing: bool,
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, Default)]
pub struct NestMetrics {
    pub elapsed: Duration,
    /// Grid positions tested by the placement engines.
    pub candidates_tested: usize,
    /// Orderings scored by the genetic search.
    pub ga_evaluations: usize,
}

/// Final product of an optimization run: the winning layout, one cut plan
/// per sheet and the run counters.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub solution: NestSolution,
    /// Engine that produced the winning layout.
    pub algorithm: Algorithm,
    pub cut_plans: Vec<CutPlan>,
    pub metrics: NestMetrics,
}

pub fn optimize(pieces: &[Piece], spec: &SheetSpec, config: &SolverConfig) -> OptimizationResult {
    optimize_with_cancel(pieces, spec, config, CancelToken::new())
}

/// Runs the configured strategy and keeps the best-scoring layout.
///
/// A hybrid run always produces the greedy layout and only adds the genetic
/// search on batches large enough for ordering to matter; the two run
/// concurrently. Cancellation finalizes whatever has been placed so far.
pub fn optimize_with_cancel(
    pieces: &[Piece],
    spec: &SheetSpec,
    config: &SolverConfig,
    cancel: CancelToken,
) -> OptimizationResult {
    let start = Instant::now();
    let mut metrics = NestMetrics::default();
    let mut candidates: Vec<(Algorithm, NestSolution)> = Vec::new();

    match config.algorithm {
        Algorithm::Blf => {
            let mut nester = BlfNester::with_cancel(pieces, spec.clone(), cancel.clone());
            candidates.push((Algorithm::Blf, nester.solve()));
            metrics.candidates_tested += nester.candidates_tested;
        }
        Algorithm::Genetic => {
            let mut nester =
                GeneticNester::with_cancel(pieces, spec.clone(), config.genetic, cancel.clone());
            candidates.push((Algorithm::Genetic, nester.solve()));
            metrics.ga_evaluations += nester.evaluations;
        }
        Algorithm::Nfp => {
            let mut nester = NfpNester::with_cancel(pieces, spec.clone(), cancel.clone());
            candidates.push((Algorithm::Nfp, nester.solve()));
            metrics.candidates_tested += nester.candidates_tested;
        }
        Algorithm::Hybrid => {
            let units: usize = pieces.iter().map(|p| p.quantity).sum();
            if units > GA_UNIT_THRESHOLD {
                debug!("[SOLVER] hybrid run over {units} units, adding the genetic search");
                let (greedy, searched) = rayon::join(
                    || {
                        let mut nester =
                            BlfNester::with_cancel(pieces, spec.clone(), cancel.clone());
                        (nester.solve(), nester.candidates_tested)
                    },
                    || {
                        let mut nester = GeneticNester::with_cancel(
                            pieces,
                            spec.clone(),
                            config.genetic,
                            cancel.clone(),
                        );
                        (nester.solve(), nester.evaluations)
                    },
                );
                metrics.candidates_tested += greedy.1;
                metrics.ga_evaluations += searched.1;
                candidates.push((Algorithm::Blf, greedy.0));
                candidates.push((Algorithm::Genetic, searched.0));
            } else {
                let mut nester = BlfNester::with_cancel(pieces, spec.clone(), cancel.clone());
                candidates.push((Algorithm::Blf, nester.solve()));
                metrics.candidates_tested += nester.candidates_tested;
            }
        }
    }

    // the greedy candidate comes first and wins ties
    let mut winner = 0;
    let mut winner_score = f64::NEG_INFINITY;
    for (i, (algorithm, solution)) in candidates.iter().enumerate() {
        let score = score_solution(solution, spec, &config.weights);
        debug!("[SOLVER] {algorithm:?} scored {score:.4}");
        if score > winner_score {
            winner_score = score;
            winner = i;
        }
    }
    let (algorithm, solution) = candidates.swap_remove(winner);

    let cut_plans = plan_cuts(&solution, config);
    metrics.elapsed = start.elapsed();
    info!(
        "[SOLVER] {:?} won with score {:.4}: {} sheets, {:.1}% efficiency, {} pierces in {:.3}ms",
        algorithm,
        winner_score,
        solution.sheet_count(),
        solution.average_efficiency,
        cut_plans.iter().map(|p| p.path.pierce_count).sum::<usize>(),
        metrics.elapsed.as_secs_f64() * 1000.0,
    );

    OptimizationResult {
        solution,
        algorithm,
        cut_plans,
        metrics,
    }
}

/// Weighted composite score of a finished layout. Layouts without sheets
/// score zero.
pub fn score_solution(
    solution: &NestSolution,
    spec: &SheetSpec,
    weights: &ObjectiveWeights,
) -> f64 {
    let sheets = solution.sheet_count();
    if sheets == 0 {
        return 0.0;
    }
    let efficiency = solution.average_efficiency / 100.0;
    let waste_reduction = 1.0 - solution.total_waste_area / (sheets as f64 * spec.area());
    let cutting_time = 1.0 / (sheets as f64 + 1.0);
    let mut score = weights.efficiency * efficiency
        + weights.waste_reduction * waste_reduction
        + weights.cutting_time * cutting_time;
    if let Some(weight) = weights.thermal_distortion {
        score += weight * thermal_spread(solution);
    }
    score
}

/// Fraction of same-sheet piece pairs whose centroids sit further apart
/// than the thermal radius. 1.0 when no pair shares a sheet.
fn thermal_spread(solution: &NestSolution) -> f64 {
    let mut pairs = 0usize;
    let mut spread = 0usize;
    for sheet in &solution.sheets {
        for (a, b) in sheet.placed.iter().tuple_combinations() {
            pairs += 1;
            if a.centroid().distance_to(&b.centroid()) > THERMAL_RADIUS {
                spread += 1;
            }
        }
    }
    match pairs {
        0 => 1.0,
        _ => spread as f64 / pairs as f64,
    }
}

/// One cut plan per sheet of the layout, in sheet order.
fn plan_cuts(solution: &NestSolution, config: &SolverConfig) -> Vec<CutPlan> {
    solution
        .sheets
        .iter()
        .map(|sheet| {
            let path = match config.thermal_sequencing {
                true => plan_thermal(sheet, config.process),
                false => plan(sheet, config.process),
            };
            let program = emit_program(&path, sheet.index);
            CutPlan {
                sheet_index: sheet.index,
                path,
                program,
            }
        })
        .collect()
}

/// Outcome shift of one perturbed parameter, relative to the unperturbed
/// greedy layout.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SensitivityRecord {
    pub parameter: String,
    /// Percentage points of average efficiency.
    pub efficiency_delta: f64,
    pub sheet_delta: i64,
    /// mm² of waste.
    pub waste_delta: f64,
}

/// Reruns the greedy engine under perturbed kerf and sheet dimensions and
/// reports how efficiency, sheet count and waste respond. A perturbation
/// that would make the sheet invalid is skipped; a negative kerf is clamped
/// to zero.
pub fn sensitivity_analysis(
    pieces: &[Piece],
    spec: &SheetSpec,
    kerf_delta: f64,
    size_delta: f64,
) -> Vec<SensitivityRecord> {
    let baseline = BlfNester::new(pieces, spec.clone()).solve();

    let mut variants: Vec<(String, SheetSpec)> = Vec::new();
    for delta in [kerf_delta, -kerf_delta] {
        let kerf = (spec.kerf + delta).max(0.0);
        if let Ok(varied) =
            SheetSpec::try_new(spec.width, spec.height, kerf, spec.thickness, &spec.material)
        {
            variants.push((format!("kerf {delta:+}"), varied));
        }
    }
    for delta in [size_delta, -size_delta] {
        if let Ok(varied) = SheetSpec::try_new(
            spec.width + delta,
            spec.height,
            spec.kerf,
            spec.thickness,
            &spec.material,
        ) {
            variants.push((format!("width {delta:+}"), varied));
        }
        if let Ok(varied) = SheetSpec::try_new(
            spec.width,
            spec.height + delta,
            spec.kerf,
            spec.thickness,
            &spec.material,
        ) {
            variants.push((format!("height {delta:+}"), varied));
        }
    }

    variants
        .into_iter()
        .map(|(parameter, varied)| {
            let outcome = BlfNester::new(pieces, varied).solve();
            let record = SensitivityRecord {
                parameter,
                efficiency_delta: outcome.average_efficiency - baseline.average_efficiency,
                sheet_delta: outcome.sheet_count() as i64 - baseline.sheet_count() as i64,
                waste_delta: outcome.total_waste_area - baseline.total_waste_area,
            };
            debug!(
                "[SOLVER] sensitivity {}: {:+.2}% efficiency, {:+} sheets",
                record.parameter, record.efficiency_delta, record.sheet_delta
            );
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> SheetSpec {
        SheetSpec::try_new(500.0, 500.0, 2.0, 3.0, "steel").unwrap()
    }

    fn seeded_config(algorithm: Algorithm) -> SolverConfig {
        SolverConfig {
            algorithm,
            genetic: GeneticConfig {
                population_size: 8,
                generations: 5,
                prng_seed: Some(11),
                ..GeneticConfig::default()
            },
            ..SolverConfig::default()
        }
    }

    #[test]
    fn hybrid_skips_the_search_on_small_batches() {
        let pieces = vec![Piece::rect("sq", 100.0, 100.0, 4)];
        let result = optimize(&pieces, &sheet(), &seeded_config(Algorithm::Hybrid));

        assert_eq!(result.algorithm, Algorithm::Blf);
        assert_eq!(result.metrics.ga_evaluations, 0);
        assert!(result.metrics.candidates_tested > 0);
    }

    #[test]
    fn hybrid_adds_the_search_on_large_batches() {
        let pieces = vec![
            Piece::rect("a", 120.0, 80.0, 6),
            Piece::rect("b", 60.0, 140.0, 6),
        ];
        let result = optimize(&pieces, &sheet(), &seeded_config(Algorithm::Hybrid));

        assert!(result.metrics.ga_evaluations > 0);
        assert_eq!(result.solution.placed_count(), 12);
        assert!(matches!(
            result.algorithm,
            Algorithm::Blf | Algorithm::Genetic
        ));
    }

    #[test]
    fn explicit_algorithms_are_dispatched_directly() {
        let pieces = vec![Piece::rect("sq", 100.0, 100.0, 2)];

        let genetic = optimize(&pieces, &sheet(), &seeded_config(Algorithm::Genetic));
        assert_eq!(genetic.algorithm, Algorithm::Genetic);

        let nfp = optimize(&pieces, &sheet(), &seeded_config(Algorithm::Nfp));
        assert_eq!(nfp.algorithm, Algorithm::Nfp);
        assert_eq!(nfp.solution.placed_count(), 2);
    }

    #[test]
    fn every_sheet_gets_a_cut_plan() {
        let pieces = vec![Piece::rect("plate", 400.0, 400.0, 2)];
        let result = optimize(&pieces, &sheet(), &seeded_config(Algorithm::Blf));

        assert_eq!(result.solution.sheet_count(), 2);
        assert_eq!(result.cut_plans.len(), 2);
        for (i, plan) in result.cut_plans.iter().enumerate() {
            assert_eq!(plan.sheet_index, i);
            assert_eq!(plan.path.pierce_count, 1);
            assert!(!plan.program.is_empty());
        }
    }

    #[test]
    fn composite_score_matches_the_weighted_objectives() {
        let pieces = vec![Piece::rect("sq", 100.0, 100.0, 2)];
        let result = optimize(&pieces, &sheet(), &seeded_config(Algorithm::Blf));

        // 0.5 * 0.08 + 0.3 * (1 - 230_000 / 250_000) + 0.2 / 2
        let score = score_solution(&result.solution, &sheet(), &ObjectiveWeights::default());
        assert!((score - 0.164).abs() < 1e-9);

        assert_eq!(
            score_solution(
                &NestSolution::default(),
                &sheet(),
                &ObjectiveWeights::default()
            ),
            0.0
        );
    }

    #[test]
    fn thermal_objective_rewards_spread_out_layouts() {
        use crate::entities::{PlacedPiece, Rotation, SheetResult};

        let layout_with = |positions: &[(f64, f64)]| {
            let placed = positions
                .iter()
                .map(|&(x, y)| PlacedPiece {
                    piece_id: 0,
                    x,
                    y,
                    width: 40.0,
                    height: 40.0,
                    rotation: Rotation::R0,
                    tag: None,
                })
                .collect();
            NestSolution {
                sheets: vec![SheetResult {
                    index: 0,
                    placed,
                    efficiency: 10.0,
                    utilized_area: 3200.0,
                    waste_area: 246_800.0,
                    weight_kg: 0.0,
                }],
                total_waste_area: 246_800.0,
                average_efficiency: 10.0,
                ..NestSolution::default()
            }
        };
        let clustered = layout_with(&[(0.0, 0.0), (42.0, 0.0)]);
        let spread = layout_with(&[(0.0, 0.0), (400.0, 400.0)]);

        let weights = ObjectiveWeights {
            thermal_distortion: Some(1.0),
            ..ObjectiveWeights::default()
        };
        let clustered_score = score_solution(&clustered, &sheet(), &weights);
        let spread_score = score_solution(&spread, &sheet(), &weights);
        // identical utilization, the spread layout wins on the thermal term
        assert!((spread_score - clustered_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sensitivity_skips_impossible_variants() {
        let pieces = vec![Piece::rect("chip", 5.0, 5.0, 2)];
        let spec = SheetSpec::try_new(8.0, 500.0, 0.0, 3.0, "steel").unwrap();
        let records = sensitivity_analysis(&pieces, &spec, DEFAULT_KERF_DELTA, DEFAULT_SIZE_DELTA);

        // width -10 would leave no sheet at all
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| r.parameter != "width -10"));
    }

    #[test]
    fn sensitivity_reports_efficiency_shifts() {
        let pieces = vec![Piece::rect("sq", 100.0, 100.0, 2)];
        let records = sensitivity_analysis(&pieces, &sheet(), 0.5, 10.0);

        assert_eq!(records.len(), 6);
        let wider = records
            .iter()
            .find(|r| r.parameter == "width +10")
            .unwrap();
        // same layout on a larger sheet is slightly less efficient
        assert!(wider.efficiency_delta < 0.0);
        assert_eq!(wider.sheet_delta, 0);
    }
}
