//! Solve one uniform random instance from the command line.

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use blockpack_core::env::bounded;
use blockpack_core::{Environment, Problem, Solver};

#[derive(Parser)]
#[command(name = "optimizer")]
#[command(about = "Generates uniform random items in [1, capacity] and solves")]
#[command(version)]
struct Args {
    /// Number of items to generate
    item_count: u32,
    /// Bin capacity
    bin_capacity: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    anyhow::ensure!(args.item_count > 0, "bad number of items");
    anyhow::ensure!(args.bin_capacity > 0, "bad bin capacity");

    let mut env = Environment::new();
    println!("Seed: {}", env.seed());

    let sizes: Vec<u32> = (0..args.item_count)
        .map(|_| bounded(env.rng(), args.bin_capacity) + 1)
        .collect();

    let started = Instant::now();
    let problem = Problem::new(&sizes, args.bin_capacity, None)?;
    let solver = Solver::new(&problem);
    let outcome = solver.run(&mut env);
    let elapsed = started.elapsed();

    let best = &outcome.best;
    let blocks = best.len() as u32;
    println!("{}", best.render(problem.items()));
    println!("Generations: {}", outcome.generations);
    println!(
        "Best: {} cuts ({} blocks)",
        problem.bin_count() - blocks,
        blocks
    );
    println!("lower bound: {}", problem.lower_bound());
    println!("Elapsed time: {} s", elapsed.as_secs_f64());

    println!(
        "OptGap: {}",
        f64::from(problem.original_item_count() + problem.lower_bound())
            / f64::from(problem.original_item_count() + problem.bin_count() - blocks)
    );
    let numerator = problem.item_count() + problem.lower_bound();
    let denominator = problem.item_count() + problem.bin_count() - blocks;
    println!(
        "OptGap (reduced): {}",
        f64::from(numerator.max(1)) / f64::from(denominator.max(1))
    );

    if problem.bin_count() - blocks == problem.lower_bound() {
        println!("===OPTIMAL==");
    }
    Ok(())
}
