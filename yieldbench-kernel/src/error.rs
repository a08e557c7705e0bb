//! Error types for the yieldbench kernel

use thiserror::Error;
use yieldbench_common::{Priority, Slot};

/// Alias for `Result<T, Error>`
pub type Result<T> = std::result::Result<T, Error>;

/// Kernel errors
#[derive(Error, Debug)]
pub enum Error {
    /// Slot already holds a live thread
    #[error("slot {0} already holds a live thread")]
    SlotOccupied(Slot),

    /// Slot holds no thread that can be started
    #[error("slot {0} holds no created thread")]
    NotCreated(Slot),

    /// Priority outside the configured range
    #[error("invalid priority: {0}")]
    InvalidPriority(Priority),

    /// A thread tried to abort the slot it runs in
    #[error("cannot abort running thread in slot {0}")]
    AbortRunning(Slot),

    /// Caller is not a thread managed by this kernel
    #[error("calling thread is not managed by this kernel")]
    ForeignThread,

    /// Failed to spawn the backing OS thread
    #[error("thread spawn failed: {0}")]
    Spawn(#[from] std::io::Error),

    /// Failed to pin the calling thread to a CPU
    #[error("cannot pin thread to CPU {cpu}: {source}")]
    Affinity {
        /// Requested CPU
        cpu: usize,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Invalid kernel configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
