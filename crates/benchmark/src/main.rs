//! Benchmark runner CLI for uniform and BPP-lib problem files.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use blockpack_benchmark::dataset::{load_bpplib, load_uniform};
use blockpack_benchmark::runner::{run_instance, RunnerConfig};
use blockpack_core::Environment;

#[derive(Parser)]
#[command(name = "bench-runner")]
#[command(about = "Benchmark runner for the blockpack solver")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run uniform problem files (one instance per line)
    Uniform {
        /// Problem files to run
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Bin capacity shared by all instances
        #[arg(short, long)]
        capacity: u32,

        /// Number of runs per instance
        #[arg(short, long, default_value = "10")]
        runs: u32,

        /// Output directory for .dat/.gen dumps
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Run BPP-lib instance files
    Bpplib {
        /// Instance files to run
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Number of runs per instance
        #[arg(short, long, default_value = "10")]
        runs: u32,

        /// Output directory for .dat/.gen dumps
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },
}

fn stem(path: &PathBuf) -> Result<String> {
    match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => Ok(stem.to_string()),
        None => bail!("cannot derive an instance name from {}", path.display()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut env = Environment::new();

    match cli.command {
        Commands::Uniform {
            files,
            capacity,
            runs,
            output,
        } => {
            let config = RunnerConfig::new()
                .with_runs(runs)
                .with_output_dir(output);
            for file in &files {
                let instances = load_uniform(file)?;
                let name = stem(file)?;
                for (index, sizes) in instances.iter().enumerate() {
                    run_instance(
                        &mut env,
                        sizes,
                        capacity,
                        None,
                        &format!("{name}_{index}"),
                        &config,
                    )?;
                }
            }
        }
        Commands::Bpplib {
            files,
            runs,
            output,
        } => {
            let config = RunnerConfig::new()
                .with_runs(runs)
                .with_output_dir(output);
            for file in &files {
                let instance = load_bpplib(file)?;
                run_instance(
                    &mut env,
                    &instance.sizes,
                    instance.bin_capacity,
                    Some(instance.bin_count),
                    &stem(file)?,
                    &config,
                )?;
            }
        }
    }

    Ok(())
}
