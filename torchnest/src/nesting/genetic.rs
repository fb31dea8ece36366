use std::cmp::Reverse;
use std::time::Instant;

use itertools::Itertools;
use log::{debug, info};
use ordered_float::OrderedFloat;
use rand::rngs::SmallRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thousands::Separable;

use crate::entities::{NestSolution, Piece, PieceInstance, SheetSpec, expand_pieces};
use crate::nesting::blf::{BlfNester, area_descending};
use crate::util::CancelToken;

/// Parameters of the genetic ordering search. The defaults are tuned for
/// shop-floor batch sizes; larger populations only pay off on big mixed
/// batches.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct GeneticConfig {
    pub population_size: usize,
    pub generations: usize,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    /// Top individuals copied unchanged into the next generation.
    pub elite_size: usize,
    pub tournament_size: usize,
    /// Generations without improvement before the search stops early.
    pub stagnation_limit: usize,
    /// Fixed seed for reproducible runs; seeded from the OS otherwise.
    pub prng_seed: Option<u64>,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        GeneticConfig {
            population_size: 50,
            generations: 100,
            mutation_rate: 0.1,
            crossover_rate: 0.8,
            elite_size: 5,
            tournament_size: 3,
            stagnation_limit: 20,
            prng_seed: None,
        }
    }
}

/// Fitness of a finished layout: utilization, waste reduction and sheet
/// count folded into one maximization target. A layout without sheets
/// scores zero.
pub fn solution_fitness(solution: &NestSolution, spec: &SheetSpec) -> f64 {
    let sheets = solution.sheet_count();
    if sheets == 0 {
        return 0.0;
    }
    let efficiency = solution.average_efficiency / 100.0;
    let waste_reduction = 1.0 - solution.total_waste_area / (sheets as f64 * spec.area());
    0.5 * efficiency + 0.3 * waste_reduction + 0.2 / (sheets as f64 + 1.0)
}

#[derive(Debug, Clone)]
struct Individual {
    genes: Vec<PieceInstance>,
    fitness: Option<f64>,
}

/// Genetic search over unit orderings and pre-placement flips, with the
/// greedy placement engine as its decoder.
///
/// The first individual always reproduces the plain greedy ordering, so the
/// search result is never worse than the greedy layout it starts from.
pub struct GeneticNester<'a> {
    pieces: &'a [Piece],
    spec: SheetSpec,
    config: GeneticConfig,
    cancel: CancelToken,
    rng: SmallRng,
    /// Number of fitness evaluations performed so far.
    pub evaluations: usize,
}

impl<'a> GeneticNester<'a> {
    pub fn new(pieces: &'a [Piece], spec: SheetSpec, config: GeneticConfig) -> Self {
        Self::with_cancel(pieces, spec, config, CancelToken::new())
    }

    pub fn with_cancel(
        pieces: &'a [Piece],
        spec: SheetSpec,
        config: GeneticConfig,
        cancel: CancelToken,
    ) -> Self {
        let mut config = config;
        config.mutation_rate = config.mutation_rate.clamp(0.0, 1.0);
        config.crossover_rate = config.crossover_rate.clamp(0.0, 1.0);
        let rng = match config.prng_seed {
            Some(seed) => {
                info!("[GA] RNG seeded with {seed}");
                SmallRng::seed_from_u64(seed)
            }
            None => SmallRng::from_os_rng(),
        };
        Self {
            pieces,
            spec,
            config,
            cancel,
            rng,
            evaluations: 0,
        }
    }

    pub fn solve(&mut self) -> NestSolution {
        let start = Instant::now();
        let (instances, warnings) = expand_pieces(self.pieces, &self.spec);
        if instances.is_empty() {
            return NestSolution::empty(warnings);
        }

        let mut population = self.seed_population(&instances);
        self.evaluate(&mut population);
        let Some(mut best) = fittest(&population).cloned() else {
            return NestSolution::empty(warnings);
        };

        let mut stagnant = 0;
        let mut completed = 0;
        for generation in 0..self.config.generations {
            if self.cancel.is_cancelled() {
                debug!("[GA] cancelled after {generation} generations");
                break;
            }
            population = self.next_generation(&population);
            self.evaluate(&mut population);
            completed = generation + 1;

            match fittest(&population) {
                Some(gen_best) if gen_best.fitness > best.fitness => {
                    debug!(
                        "[GA] generation {}: best fitness improved to {:.4}",
                        completed,
                        gen_best.fitness.unwrap_or(0.0)
                    );
                    best = gen_best.clone();
                    stagnant = 0;
                }
                _ => {
                    stagnant += 1;
                    if stagnant >= self.config.stagnation_limit {
                        debug!("[GA] stagnated after {completed} generations");
                        break;
                    }
                }
            }
        }

        let mut placer = BlfNester::new(self.pieces, self.spec.clone());
        let solution = placer.place_ordered(&best.genes, warnings);
        info!(
            "[GA] finished after {} generations: best fitness {:.4}, {} evaluations in {:.3}ms",
            completed,
            best.fitness.unwrap_or(0.0),
            self.evaluations.separate_with_commas(),
            start.elapsed().as_secs_f64() * 1000.0,
        );
        solution
    }

    /// Seeds the population by cycling four ordering strategies, then flips
    /// the orientation of rotatable units with 30% probability. Individual 0
    /// is left unflipped to anchor the greedy baseline.
    fn seed_population(&mut self, instances: &[PieceInstance]) -> Vec<Individual> {
        let size = self.config.population_size.max(2);
        let mut population = Vec::with_capacity(size);
        for i in 0..size {
            let mut genes = match i % 4 {
                0 => area_descending(self.pieces, instances),
                1 => self.sorted_desc(instances, |p| p.width),
                2 => self.sorted_desc(instances, |p| p.height),
                _ => {
                    let mut shuffled = instances.to_vec();
                    shuffled.shuffle(&mut self.rng);
                    shuffled
                }
            };
            if i > 0 {
                for gene in &mut genes {
                    if self.pieces[gene.piece_id].allow_rotation && self.rng.random_bool(0.3) {
                        gene.flipped = !gene.flipped;
                    }
                }
            }
            population.push(Individual {
                genes,
                fitness: None,
            });
        }
        debug!("[GA] seeded population of {}", population.len());
        population
    }

    fn sorted_desc(
        &self,
        instances: &[PieceInstance],
        key: impl Fn(&Piece) -> f64,
    ) -> Vec<PieceInstance> {
        instances
            .iter()
            .copied()
            .sorted_by_cached_key(|inst| Reverse(OrderedFloat(key(&self.pieces[inst.piece_id]))))
            .collect()
    }

    /// Scores every unscored individual by running the placement engine on
    /// its ordering. Evaluations are independent and run in parallel.
    fn evaluate(&mut self, population: &mut [Individual]) {
        let pieces = self.pieces;
        let spec = &self.spec;
        let fresh = population.iter().filter(|i| i.fitness.is_none()).count();
        population
            .par_iter_mut()
            .filter(|ind| ind.fitness.is_none())
            .for_each(|ind| {
                let mut placer = BlfNester::new(pieces, spec.clone());
                let solution = placer.place_ordered(&ind.genes, vec![]);
                ind.fitness = Some(solution_fitness(&solution, spec));
            });
        self.evaluations += fresh;
    }

    fn next_generation(&mut self, population: &[Individual]) -> Vec<Individual> {
        let size = population.len();
        let elite = self.config.elite_size.min(size);
        let mut next = Vec::with_capacity(size);

        // elites survive unchanged, their fitness is already known
        let ranked: Vec<&Individual> = population
            .iter()
            .sorted_by_cached_key(|ind| Reverse(OrderedFloat(ind.fitness.unwrap_or(0.0))))
            .collect();
        next.extend(ranked[..elite].iter().map(|&ind| ind.clone()));

        while next.len() < size {
            let a = self.tournament(population);
            let b = self.tournament(population);
            let (mut left, mut right) = if self.rng.random_bool(self.config.crossover_rate) {
                self.crossover(&a.genes, &b.genes)
            } else {
                (a.genes.clone(), b.genes.clone())
            };
            self.mutate(&mut left);
            self.mutate(&mut right);
            next.push(Individual {
                genes: left,
                fitness: None,
            });
            if next.len() < size {
                next.push(Individual {
                    genes: right,
                    fitness: None,
                });
            }
        }
        next
    }

    /// Tournament selection: the fittest of `tournament_size` uniform draws.
    fn tournament<'p>(&mut self, population: &'p [Individual]) -> &'p Individual {
        let rounds = self.config.tournament_size.max(1);
        let mut best = &population[self.rng.random_range(0..population.len())];
        for _ in 1..rounds {
            let challenger = &population[self.rng.random_range(0..population.len())];
            if challenger.fitness > best.fitness {
                best = challenger;
            }
        }
        best
    }

    fn crossover(
        &mut self,
        a: &[PieceInstance],
        b: &[PieceInstance],
    ) -> (Vec<PieceInstance>, Vec<PieceInstance>) {
        let n = a.len();
        if n < 2 {
            return (a.to_vec(), b.to_vec());
        }
        let cut = self.rng.random_range(1..n);
        (splice(a, b, cut), splice(b, a, cut))
    }

    fn mutate(&mut self, genes: &mut [PieceInstance]) {
        if genes.is_empty() || !self.rng.random_bool(self.config.mutation_rate) {
            return;
        }
        let n = genes.len();
        let roll: f64 = self.rng.random();
        if roll < 0.4 {
            let i = self.rng.random_range(0..n);
            let j = self.rng.random_range(0..n);
            genes.swap(i, j);
        } else if roll < 0.7 {
            let rotatable: Vec<usize> = genes
                .iter()
                .enumerate()
                .filter(|(_, g)| self.pieces[g.piece_id].allow_rotation)
                .map(|(i, _)| i)
                .collect();
            if let Some(&i) = rotatable.choose(&mut self.rng) {
                genes[i].flipped = !genes[i].flipped;
            }
        } else if n >= 2 {
            let len = self.rng.random_range(2..=n.min(5));
            let start = self.rng.random_range(0..=n - len);
            genes[start..start + len].shuffle(&mut self.rng);
        }
    }
}

fn fittest(population: &[Individual]) -> Option<&Individual> {
    population
        .iter()
        .max_by_key(|ind| OrderedFloat(ind.fitness.unwrap_or(0.0)))
}

/// Single-point crossover child preserving unit multiplicity: the left
/// parent's prefix, then the right parent's genes in order, skipping units
/// the prefix already contains.
fn splice(prefix: &[PieceInstance], rest: &[PieceInstance], cut: usize) -> Vec<PieceInstance> {
    let mut taken = vec![false; prefix.len()];
    let mut child = Vec::with_capacity(prefix.len());
    for gene in &prefix[..cut] {
        taken[gene.uid] = true;
        child.push(*gene);
    }
    for gene in rest {
        if !taken[gene.uid] {
            taken[gene.uid] = true;
            child.push(*gene);
        }
    }
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Piece, WarningKind};

    fn sheet() -> SheetSpec {
        SheetSpec::try_new(500.0, 500.0, 2.0, 3.0, "steel").unwrap()
    }

    fn small_config(seed: u64) -> GeneticConfig {
        GeneticConfig {
            population_size: 12,
            generations: 10,
            prng_seed: Some(seed),
            ..GeneticConfig::default()
        }
    }

    fn mixed_batch() -> Vec<Piece> {
        vec![
            Piece::rect("a", 180.0, 120.0, 2),
            Piece::rect("b", 90.0, 220.0, 2),
            Piece::rect("c", 60.0, 60.0, 4),
        ]
    }

    fn placements(solution: &NestSolution) -> Vec<(usize, f64, f64, f64, f64)> {
        solution
            .sheets
            .iter()
            .flat_map(|s| s.placed.iter())
            .map(|p| (p.piece_id, p.x, p.y, p.width, p.height))
            .collect()
    }

    #[test]
    fn same_seed_reproduces_the_same_layout() {
        let pieces = mixed_batch();
        let first = GeneticNester::new(&pieces, sheet(), small_config(42)).solve();
        let second = GeneticNester::new(&pieces, sheet(), small_config(42)).solve();

        assert_eq!(placements(&first), placements(&second));
        assert_eq!(first.sheet_count(), second.sheet_count());
    }

    #[test]
    fn search_never_regresses_below_the_greedy_layout() {
        let spec = sheet();
        let pieces = mixed_batch();

        let greedy = BlfNester::new(&pieces, spec.clone()).solve();
        let searched = GeneticNester::new(&pieces, spec.clone(), small_config(7)).solve();

        let greedy_fitness = solution_fitness(&greedy, &spec);
        let searched_fitness = solution_fitness(&searched, &spec);
        assert!(searched_fitness >= greedy_fitness - 1e-9);
        assert_eq!(searched.placed_count(), greedy.placed_count());
    }

    #[test]
    fn splice_preserves_the_unit_multiset() {
        let a: Vec<PieceInstance> = (0..6)
            .map(|uid| PieceInstance {
                uid,
                piece_id: 0,
                flipped: false,
            })
            .collect();
        let mut b = a.clone();
        b.reverse();

        let child = splice(&a, &b, 3);
        assert_eq!(child.len(), 6);
        assert_eq!(&child[..3], &a[..3]);
        let mut uids: Vec<usize> = child.iter().map(|g| g.uid).collect();
        uids.sort_unstable();
        assert_eq!(uids, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn fitness_of_an_empty_layout_is_zero() {
        let solution = NestSolution::default();
        assert_eq!(solution_fitness(&solution, &sheet()), 0.0);
    }

    #[test]
    fn warnings_survive_the_search() {
        let pieces = vec![Piece::rect("huge", 600.0, 600.0, 1)];
        let solution = GeneticNester::new(&pieces, sheet(), small_config(1)).solve();

        assert_eq!(solution.sheet_count(), 0);
        assert_eq!(solution.warnings.len(), 1);
        assert_eq!(solution.warnings[0].kind, WarningKind::TooLargeForSheet);
    }
}
