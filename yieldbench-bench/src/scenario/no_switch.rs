//! Yield with only lower-priority work runnable

use super::Scenario;
use crate::error::Result;
use crate::stats::StatsAccumulator;
use std::sync::Arc;
use tracing::trace;
use yieldbench_common::{Priority, ScenarioKind};
use yieldbench_kernel::{Error as KernelError, ThreadControl, TimeSource};

/// Body run by a helper thread if it is ever scheduled
pub type HelperBody = Arc<dyn Fn() + Send + Sync + 'static>;

/// Yield latency without a context switch
///
/// The helper sits one priority level below the benchmark thread, so the
/// yield finds nothing eligible and returns to the caller. The helper is
/// aborted before it ever runs.
pub struct NoSwitch<K, C> {
    kernel: K,
    clock: Arc<C>,
    body: HelperBody,
}

impl<K: ThreadControl, C: TimeSource> NoSwitch<K, C> {
    /// Create the scenario with an empty helper body
    pub fn new(kernel: K, clock: Arc<C>) -> Self {
        Self {
            kernel,
            clock,
            body: Arc::new(|| {}),
        }
    }

    /// Replace the helper body
    pub fn with_helper_body(mut self, body: HelperBody) -> Self {
        self.body = body;
        self
    }

    fn measure(&self, iteration: u32, stats: &mut StatsAccumulator) -> Result<()> {
        self.kernel.thread_start(ScenarioKind::NoSwitch.slot())?;

        let start = self.clock.counter_get();
        self.kernel.yield_now();
        let end = self.clock.counter_get();

        let cycles = self.clock.cycles_get(start, end);
        stats.update(cycles, iteration);
        trace!(iteration, cycles, "no-switch sample");
        Ok(())
    }
}

impl<K: ThreadControl, C: TimeSource> Scenario for NoSwitch<K, C> {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::NoSwitch
    }

    fn gather(
        &mut self,
        priority: Priority,
        iteration: u32,
        stats: &mut StatsAccumulator,
    ) -> Result<()> {
        let kind = self.kind();
        let helper_priority = kind
            .helper_priority(priority)
            .ok_or(KernelError::InvalidPriority(priority))?;

        let body = Arc::clone(&self.body);
        self.kernel.thread_create(
            kind.slot(),
            kind.helper_name(),
            helper_priority,
            Box::new(move || body()),
        )?;

        let measured = self.measure(iteration, stats);
        self.kernel.thread_abort(kind.slot())?;
        measured
    }
}
