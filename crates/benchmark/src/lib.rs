//! Benchmark drivers for the blockpack solver.
//!
//! This crate provides:
//! - Parsers for uniform and BPP-lib problem files
//! - The four-stage benchmark protocol (G, B3G, Stage 1, Stage 2)
//! - `.dat` and `.gen` result dumps

pub mod dataset;
pub mod report;
pub mod runner;

pub use dataset::{load_bpplib, load_uniform, parse_bpplib, parse_uniform, BppInstance};
pub use report::{write_gen, DatReport, StageLine};
pub use runner::{run_instance, RunnerConfig};
