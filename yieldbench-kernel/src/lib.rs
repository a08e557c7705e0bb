//! # yieldbench kernel
//!
//! A simulated uniprocessor priority scheduler and host time source,
//! exposing the collaborator interfaces the yield benchmark consumes.
//!
//! ## Key Components
//!
//! - **Ports**: [`ThreadControl`] and [`TimeSource`], the only surfaces the
//!   measurement harness talks to
//! - **Kernel**: priority scheduler where exactly one thread holds the CPU;
//!   equal priorities round-robin on yield, lower priorities never run
//!   while a higher or equal priority thread is runnable
//! - **Slots**: a fixed arena of thread control blocks, one per [`Slot`]
//! - **HostClock**: monotonic 1 GHz counter
//!
//! ## Usage
//!
//! ```rust,no_run
//! use yieldbench_kernel::{Builder, ThreadControl};
//! use yieldbench_common::Slot;
//!
//! let kernel = Builder::new().build().unwrap();
//! let helper = kernel.clone();
//!
//! kernel
//!     .thread_create(Slot::Helper, "partner", 0, Box::new(move || loop {
//!         helper.yield_now();
//!     }))
//!     .unwrap();
//! kernel.thread_start(Slot::Helper).unwrap();
//!
//! // Hands the CPU to the partner and back
//! kernel.yield_now();
//!
//! kernel.thread_abort(Slot::Helper).unwrap();
//! ```

pub mod affinity;
pub mod clock;
pub mod error;
pub mod kernel;
pub mod port;
mod runqueue;
mod thread;

pub use clock::{HostClock, HOST_CLOCK_HZ};
pub use error::{Error, Result};
pub use kernel::{Builder, Kernel, KernelConfig, KernelStats};
pub use port::{ThreadControl, ThreadEntry, TimeSource, Timestamp};

/// Re-export common types
pub use yieldbench_common::{Priority, Slot, ThreadState};
