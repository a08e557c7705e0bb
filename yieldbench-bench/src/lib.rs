//! # yieldbench
//!
//! Measures the latency of a cooperative yield on a uniprocessor priority
//! scheduler, in two scenarios:
//!
//! - **no context switch**: only a lower-priority thread is runnable, so
//!   the yield returns to the caller
//! - **context switch**: an equal-priority thread is runnable, so the
//!   yield hands the CPU over
//!
//! The harness talks to the scheduler and clock only through
//! [`ThreadControl`] and [`TimeSource`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use yieldbench::{BenchConfig, BenchmarkRunner};
//! use yieldbench_kernel::{Builder, HostClock};
//!
//! let kernel = Builder::new().build().unwrap();
//! let clock = Arc::new(HostClock::new());
//!
//! let mut runner = BenchmarkRunner::new(kernel, clock, BenchConfig::default());
//! let summary = runner.run().unwrap();
//! println!("{summary}");
//! ```

pub mod config;
pub mod error;
pub mod runner;
pub mod scenario;
pub mod stats;
pub mod timing;

pub use config::BenchConfig;
pub use error::{Error, Result};
pub use runner::{BenchmarkRunner, RunSummary, ScenarioReport};
pub use scenario::{ContextSwitch, HelperStamp, NoSwitch, Scenario};
pub use stats::{StatsAccumulator, StatsSummary};
pub use timing::TimingSession;

/// Re-export collaborator interfaces
pub use yieldbench_kernel::{ThreadControl, TimeSource, Timestamp};

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_impl_all;
    use yieldbench_kernel::{HostClock, Kernel};

    assert_impl_all!(Error: std::error::Error, Send, Sync);
    assert_impl_all!(HelperStamp: Send, Sync);
    assert_impl_all!(ScenarioReport: Copy, std::fmt::Display);
    assert_impl_all!(BenchmarkRunner<Kernel, HostClock>: Send);
}
