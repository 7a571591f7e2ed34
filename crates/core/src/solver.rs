//! Grouping genetic algorithm driver.

use crate::env::Environment;
use crate::operators::{adaptive_mutation, gene_level_crossover};
use crate::problem::{Problem, Workspace};
use crate::select::{
    controlled_replacement_crossover, controlled_replacement_mutation,
    controlled_selection_crossover, controlled_selection_mutation,
};
use crate::solution::Solution;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters of the generational loop.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Population size.
    pub population_size: usize,
    /// Progeny produced by crossover per generation (even).
    pub crossover_count: usize,
    /// Individuals considered for mutation per generation.
    pub mutant_count: usize,
    /// Size of the elite prefix preserved across generations.
    pub elite_count: usize,
    /// Age at which an elite individual stops being cloned.
    pub lifespan: u32,
    /// Maximum number of generations.
    pub max_generations: u32,
    /// Generations without improvement before giving up.
    pub stagnation_limit: u32,
    /// Mutation aggressiveness for in-place mutants.
    pub k1: f64,
    /// Mutation aggressiveness for mutated elite clones.
    pub k2: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            crossover_count: 20,
            mutant_count: 83,
            elite_count: 10,
            lifespan: 10,
            max_generations: 500,
            stagnation_limit: 100,
            k1: 1.3,
            k2: 4.0,
        }
    }
}

impl SolverConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size.max(2);
        self
    }

    /// Sets the maximum generations.
    pub fn with_max_generations(mut self, generations: u32) -> Self {
        self.max_generations = generations;
        self
    }

    /// Sets the stagnation limit.
    pub fn with_stagnation_limit(mut self, limit: u32) -> Self {
        self.stagnation_limit = limit;
        self
    }

    /// Sets the elite count.
    pub fn with_elite_count(mut self, count: usize) -> Self {
        self.elite_count = count;
        self
    }
}

/// Result of a full solver run.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    /// Best solution observed.
    pub best: Solution,
    /// Generations executed.
    pub generations: u32,
    /// Whether the lower bound was attained.
    pub optimal: bool,
    /// Best block count per generation, including generation zero.
    pub history: Vec<u32>,
}

/// The GGA solver over one problem.
pub struct Solver<'a> {
    problem: &'a Problem,
    config: SolverConfig,
}

impl<'a> Solver<'a> {
    /// Creates a solver with default parameters.
    pub fn new(problem: &'a Problem) -> Self {
        Self::with_config(problem, SolverConfig::default())
    }

    /// Creates a solver with the given parameters.
    pub fn with_config(problem: &'a Problem, config: SolverConfig) -> Self {
        Self { problem, config }
    }

    /// The active configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Runs the generational loop over a pre-initialized population
    /// sorted by block count descending. Returns the best solution seen;
    /// `generations` receives the executed generation count and
    /// `blocks_over_time`, when given, the running best block count.
    pub fn solve(
        &self,
        env: &mut Environment,
        population: &mut Vec<Solution>,
        generations: &mut u32,
        mut blocks_over_time: Option<&mut Vec<u32>>,
    ) -> Solution {
        let cfg = &self.config;
        let np = cfg.population_size;
        let nc = cfg.crossover_count;
        let ne = cfg.elite_count;
        debug_assert_eq!(population.len(), np);
        debug_assert!(nc % 2 == 0 && nc >= 4);
        debug_assert!(np >= ne + nc);
        debug_assert!(cfg.mutant_count <= np && ne <= cfg.mutant_count);

        let problem = self.problem;
        let mut workspace = Workspace::new(problem);
        let mut best = population[0].clone();
        let mut previous = best.len();
        let mut delta_counter = 0u32;
        let mut generation = 0u32;

        while generation < cfg.max_generations
            && problem.bin_count() - best.len() as u32 > problem.lower_bound()
            && delta_counter < cfg.stagnation_limit
        {
            let (good, random) = controlled_selection_crossover(env, np, nc, ne);
            let mut progeny = Vec::with_capacity(nc);
            for i in 0..nc / 2 {
                progeny.push(gene_level_crossover(
                    problem,
                    env,
                    &mut workspace,
                    &population[good[i]],
                    &population[random[i]],
                ));
            }
            for i in 0..nc / 2 {
                progeny.push(gene_level_crossover(
                    problem,
                    env,
                    &mut workspace,
                    &population[random[i]],
                    &population[good[i]],
                ));
            }
            controlled_replacement_crossover(population, progeny, &random, nc, ne);

            let (clone_indices, mutant_indices) =
                controlled_selection_mutation(population, cfg.mutant_count, ne, cfg.lifespan);
            let mut is_clone = vec![false; np];
            for &index in &clone_indices {
                is_clone[index] = true;
            }
            let mut cloned: Vec<Solution> = clone_indices
                .iter()
                .map(|&index| population[index].clone())
                .collect();

            for &index in &mutant_indices {
                if !is_clone[index] {
                    adaptive_mutation(
                        problem,
                        env,
                        &mut workspace,
                        &mut population[index],
                        cfg.k1,
                    );
                }
            }
            for clone in &mut cloned {
                adaptive_mutation(problem, env, &mut workspace, clone, cfg.k2);
            }

            population.sort_by(|l, r| r.len().cmp(&l.len()));
            if !cloned.is_empty() {
                controlled_replacement_mutation(population, cloned);
            }

            if population[0].len() > best.len() {
                best = population[0].clone();
            }
            if previous == best.len() {
                delta_counter += 1;
            } else {
                previous = best.len();
                delta_counter = 0;
            }

            for elite in &mut population[..ne] {
                elite.increase_age(1);
            }

            if let Some(log) = blocks_over_time.as_deref_mut() {
                log.push(best.len() as u32);
            }
            generation += 1;
            tracing::debug!(
                "generation {}: {} cuts over a lower bound of {}",
                generation,
                problem.bin_count() - best.len() as u32,
                problem.lower_bound()
            );
        }

        *generations = generation;
        best
    }

    /// Convenience entry point: handles solved instances, initializes
    /// the population with B3 G+, short-circuits when an initial
    /// individual already attains the lower bound and otherwise runs the
    /// generational loop.
    pub fn run(&self, env: &mut Environment) -> SolveOutcome {
        let problem = self.problem;
        let mut workspace = Workspace::new(problem);

        if problem.solved() {
            let best = problem.trivial_solution(env, &mut workspace);
            return SolveOutcome {
                best,
                generations: 0,
                optimal: true,
                history: Vec::new(),
            };
        }

        let mut population = Vec::with_capacity(self.config.population_size);
        for _ in 0..self.config.population_size {
            let individual = problem.generate_individual(env, &mut workspace, true);
            if problem.bin_count() - individual.len() as u32 == problem.lower_bound() {
                let history = vec![individual.len() as u32];
                return SolveOutcome {
                    best: individual,
                    generations: 0,
                    optimal: true,
                    history,
                };
            }
            population.push(individual);
        }
        population.sort_by(|l, r| r.len().cmp(&l.len()));

        let mut history = vec![population[0].len() as u32];
        let mut generations = 0;
        let best = self.solve(env, &mut population, &mut generations, Some(&mut history));
        let optimal =
            problem.bin_count() - best.len() as u32 == problem.lower_bound();
        SolveOutcome {
            best,
            generations,
            optimal,
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SolverConfig {
        let mut config = SolverConfig::default()
            .with_population_size(30)
            .with_max_generations(40)
            .with_stagnation_limit(20)
            .with_elite_count(4);
        config.crossover_count = 8;
        config.mutant_count = 20;
        config.lifespan = 5;
        config
    }

    #[test]
    fn config_builders() {
        let config = SolverConfig::new()
            .with_population_size(1)
            .with_max_generations(7);
        assert_eq!(config.population_size, 2);
        assert_eq!(config.max_generations, 7);
        assert_eq!(config.stagnation_limit, 100);
    }

    #[test]
    fn run_respects_the_lower_bound() {
        let sizes = [7, 7, 6, 5, 5, 4, 4, 3, 3, 3, 2, 2, 2, 1, 1];
        let problem = Problem::new(&sizes, 9, None).unwrap();
        assert!(!problem.solved());
        let mut env = Environment::with_seed(31337);
        let solver = Solver::with_config(&problem, small_config());
        let outcome = solver.run(&mut env);
        let splits = problem.bin_count() - outcome.best.len() as u32;
        assert!(splits >= problem.lower_bound());
        assert!(outcome.generations <= 40);
    }

    #[test]
    fn run_is_deterministic_for_a_fixed_seed() {
        let sizes = [8, 7, 7, 6, 5, 5, 5, 4, 3, 3, 2, 2, 2, 1, 1];
        let problem = Problem::new(&sizes, 9, None).unwrap();
        let solver = Solver::with_config(&problem, small_config());

        let mut env = Environment::with_seed(99);
        let first = solver.run(&mut env);
        env.reseed_with(99);
        let second = solver.run(&mut env);

        assert_eq!(first.best.len(), second.best.len());
        assert_eq!(first.best.items(), second.best.items());
        assert_eq!(first.generations, second.generations);
        assert_eq!(first.history, second.history);
    }

    #[test]
    fn solved_problems_skip_the_loop() {
        let problem = Problem::new(&[5, 5], 5, Some(2)).unwrap();
        assert!(problem.solved());
        let mut env = Environment::with_seed(1);
        let outcome = Solver::new(&problem).run(&mut env);
        assert!(outcome.optimal);
        assert_eq!(outcome.generations, 0);
        // Both bins were peeled off by E1; the reductions carry the two
        // blocks and the reduced instance is empty.
        assert_eq!(problem.full_block_count(&outcome.best), 2);
        assert_eq!(outcome.best.len(), 0);
    }
}
