//! Error types for the yield benchmark

use thiserror::Error;
use yieldbench_common::Priority;

/// Alias for `Result<T, Error>`
pub type Result<T> = std::result::Result<T, Error>;

/// Benchmark errors
///
/// Every error is fatal to the run; there is no retry or partial result.
#[derive(Error, Debug)]
pub enum Error {
    /// A kernel primitive failed
    #[error("kernel error: {0}")]
    Kernel(#[from] yieldbench_kernel::Error),

    /// The benchmark thread is no longer at its fixed priority
    #[error("priority drifted: expected {expected}, found {actual}")]
    PriorityDrift {
        /// Priority set during INIT
        expected: Priority,
        /// Priority observed before a scenario invocation
        actual: Priority,
    },

    /// The context-switch helper never recorded its start timestamp
    #[error("helper did not publish its start timestamp in iteration {iteration}")]
    MissingHelperStamp {
        /// Iteration that lost the handshake
        iteration: u32,
    },

    /// The runner reached DONE and cannot be restarted
    #[error("benchmark already finished")]
    AlreadyFinished,
}
