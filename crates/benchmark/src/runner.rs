//! Four-stage benchmark protocol over one problem instance.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use blockpack_core::{Environment, Problem, Solution, Solver, SolverConfig, Workspace};

use crate::report::{write_gen, DatReport, StageLine};

/// Configuration for benchmark runs.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Independent runs per instance, each with a fresh seed.
    pub runs: u32,
    /// Directory receiving the `.dat` and `.gen` dumps.
    pub output_dir: PathBuf,
    /// Solver parameters shared by all runs.
    pub solver: SolverConfig,
    /// Whether to print per-run progress.
    pub show_progress: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            runs: 10,
            output_dir: PathBuf::from("results"),
            solver: SolverConfig::default(),
            show_progress: true,
        }
    }
}

impl RunnerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the run count.
    pub fn with_runs(mut self, runs: u32) -> Self {
        self.runs = runs.max(1);
        self
    }

    /// Sets the output directory.
    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }
}

fn stage(problem: &Problem, solution: &Solution, started: Instant) -> StageLine {
    StageLine {
        blocks: problem.full_block_count(solution),
        splits: problem.bin_count() - solution.len() as u32,
        duration: started.elapsed().as_secs_f64(),
    }
}

/// Runs the four-stage protocol over one instance and writes one
/// `.dat`/`.gen` pair per run under the configured output directory,
/// named `<name>_<run>.dat` and `<name>_<run>.gen`.
///
/// Each run reseeds the environment, then replays the same seed for G+
/// alone, for B3 G+, and for the two genetic stages, so the stages are
/// directly comparable. Reported block counts include the bins peeled
/// off by the reductions, each of which is one optimal block; splits
/// are counted over the reduced bins, where cuts can still occur.
pub fn run_instance(
    env: &mut Environment,
    sizes: &[u32],
    bin_capacity: u32,
    bin_count: Option<u32>,
    name: &str,
    config: &RunnerConfig,
) -> Result<()> {
    let reduction_started = Instant::now();
    let problem = Problem::new(sizes, bin_capacity, bin_count)
        .with_context(|| format!("instance {name} is invalid"))?;
    let reduction_seconds = reduction_started.elapsed().as_secs_f64();

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("cannot create {}", config.output_dir.display()))?;

    let solver = Solver::with_config(&problem, config.solver.clone());
    let np = config.solver.population_size;

    for run in 0..config.runs {
        env.reseed();
        let seed = env.seed();
        let mut workspace = Workspace::new(&problem);

        let started = Instant::now();
        let solution_g = problem.generate_individual(env, &mut workspace, false);
        let g = stage(&problem, &solution_g, started);

        env.reseed_with(seed);
        let started = Instant::now();
        let solution_b3g = problem.generate_individual(env, &mut workspace, true);
        let b3g = stage(&problem, &solution_b3g, started);

        env.reseed_with(seed);
        let started = Instant::now();
        let mut population = Vec::with_capacity(np);
        let mut found_optimal = false;
        for _ in 0..np {
            let individual = problem.generate_individual(env, &mut workspace, true);
            let attained = problem.bin_count() - individual.len() as u32;
            population.push(individual);
            if attained == problem.lower_bound() {
                found_optimal = true;
                break;
            }
        }
        population.sort_by(|l, r| r.len().cmp(&l.len()));
        let stage1 = stage(&problem, &population[0], started);

        let mut history = vec![population[0].len() as u32];
        let mut generations = 0;
        let stage2 = if found_optimal || population.len() < np {
            StageLine {
                duration: 0.0,
                ..stage1
            }
        } else {
            let started = Instant::now();
            let best = solver.solve(env, &mut population, &mut generations, Some(&mut history));
            stage(&problem, &best, started)
        };

        let report = DatReport {
            seed,
            items_before: problem.original_item_count(),
            items_after: problem.item_count(),
            reduction_seconds,
            bin_count: problem.bin_count(),
            lower_bound: problem.lower_bound(),
            g,
            b3g,
            stage1,
            stage2,
        };

        let dat_path = config.output_dir.join(format!("{name}_{run}.dat"));
        let mut dat = BufWriter::new(
            File::create(&dat_path)
                .with_context(|| format!("cannot create {}", dat_path.display()))?,
        );
        report.write_to(&mut dat)?;

        let gen_path = config.output_dir.join(format!("{name}_{run}.gen"));
        let mut gen_out = BufWriter::new(
            File::create(&gen_path)
                .with_context(|| format!("cannot create {}", gen_path.display()))?,
        );
        write_gen(&mut gen_out, &history)?;

        if config.show_progress {
            println!(
                "{name} run {run}: seed {seed}, {} / {} splits (lower bound {})",
                report.stage2.splits,
                problem.bin_count(),
                problem.lower_bound()
            );
        }
        tracing::debug!(
            "{name} run {run}: {} generations, stage2 {} blocks",
            generations,
            report.stage2.blocks
        );
    }

    Ok(())
}
