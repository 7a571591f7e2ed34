//! Error types for problem construction.

use thiserror::Error;

/// Errors raised while constructing a [`crate::Problem`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The bin capacity was zero.
    #[error("bin capacity must be positive")]
    InvalidCapacity,

    /// The caller-supplied bin count is below the minimum implied by the
    /// item sizes.
    #[error("bin count {supplied} is below the required minimum {required}")]
    InvalidBinCount {
        /// Bin count given by the caller.
        supplied: u32,
        /// Smallest bin count that can hold the items.
        required: u32,
    },
}

/// Convenience result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
