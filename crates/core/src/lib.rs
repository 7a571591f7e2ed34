//! # Blockpack Core
//!
//! Solver for the one-dimensional bin-packing / cutting-stock problem
//! in its "minimize the number of cuts" form: given integer item sizes,
//! a bin capacity and a bin count, assign items to bins so that as many
//! contiguous groups of saturated bins (blocks) as possible emerge.
//!
//! ## Components
//!
//! - **Environment**: seedable PCG-32 randomness ([`Environment`])
//! - **Problem**: E1/E2 reductions, the L3* lower bound and the
//!   precomputed 3-partition pool ([`Problem`], [`l3star`])
//! - **Packers**: the randomized partition consumer B3 and the
//!   shuffled next-fit fragmentation packer G+ (methods on [`Problem`])
//! - **Solutions**: item slots grouped into 1- or 2-bin blocks
//!   ([`Solution`], [`Block`])
//! - **GGA**: gene-level grouping crossover, adaptive mutation and the
//!   controlled selection/replacement loop ([`Solver`])
//!
//! ## Determinism
//!
//! All randomness flows through an [`Environment`]; a run with a fixed
//! seed replays identical results. The solver is strictly
//! single-threaded and performs no I/O.
//!
//! ## Example
//!
//! ```rust
//! use blockpack_core::{Environment, Problem, Solver};
//!
//! let mut env = Environment::with_seed(7);
//! let problem = Problem::new(&[7, 5, 4, 3, 3, 2], 8, None).unwrap();
//! let outcome = Solver::new(&problem).run(&mut env);
//! assert!(problem.bin_count() - outcome.best.len() as u32 >= problem.lower_bound());
//! ```
//!
//! ## Feature flags
//!
//! - `serde`: serialization support for the solver configuration

pub mod bound;
pub mod env;
pub mod error;
pub mod item;
pub mod operators;
pub mod partition;
pub mod problem;
mod select;
pub mod solution;
pub mod solver;

pub use bound::l3star;
pub use env::Environment;
pub use error::{Error, Result};
pub use item::{frequency_count, ItemCount};
pub use operators::{adaptive_mutation, gene_level_crossover};
pub use partition::{threesum, Partition};
pub use problem::{Problem, Workspace};
pub use solution::{Block, Slot, Solution};
pub use solver::{SolveOutcome, Solver, SolverConfig};
