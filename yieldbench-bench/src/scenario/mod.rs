//! Measurement scenarios
//!
//! A scenario performs one measured iteration: it creates and starts its
//! helper thread, times a single yield, folds the sample into the
//! statistics and aborts the helper. The two scenarios differ only in the
//! helper's priority and in what the helper does once it runs.

mod context_switch;
mod no_switch;

pub use context_switch::{ContextSwitch, HelperStamp};
pub use no_switch::{HelperBody, NoSwitch};

use crate::error::Result;
use crate::stats::StatsAccumulator;
use yieldbench_common::{Priority, ScenarioKind};

/// One measurement scenario
pub trait Scenario {
    /// Which scenario this is
    fn kind(&self) -> ScenarioKind;

    /// Run measured iteration `iteration` (1-based) with the benchmark
    /// thread at `priority`, folding the sample into `stats`.
    fn gather(
        &mut self,
        priority: Priority,
        iteration: u32,
        stats: &mut StatsAccumulator,
    ) -> Result<()>;
}
