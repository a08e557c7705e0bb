//! Yield to an equal-priority thread

use super::Scenario;
use crate::error::{Error, Result};
use crate::stats::StatsAccumulator;
use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;
use yieldbench_common::{Priority, ScenarioKind};
use yieldbench_kernel::{ThreadControl, TimeSource, Timestamp};

/// Start timestamp handed from the helper to the benchmark thread
///
/// Single producer (the helper), single consumer (the benchmark thread).
/// The helper publishes before it yields back, and the consumer takes
/// only after it regains the CPU.
#[derive(Debug, Default)]
pub struct HelperStamp {
    value: CachePadded<AtomicU64>,
    published: AtomicBool,
}

impl HelperStamp {
    /// Create an empty stamp
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the helper's start timestamp
    pub fn publish(&self, timestamp: Timestamp) {
        self.value.store(timestamp.cycles(), Ordering::Relaxed);
        self.published.store(true, Ordering::Release);
    }

    /// Consume the published timestamp, if any
    pub fn take(&self) -> Option<Timestamp> {
        if self.published.swap(false, Ordering::Acquire) {
            Some(Timestamp(self.value.load(Ordering::Relaxed)))
        } else {
            None
        }
    }
}

/// Yield latency across a context switch
///
/// The helper runs at the benchmark thread's priority. Each iteration:
///
/// 1. the benchmark thread yields, the helper runs and yields straight back
/// 2. the benchmark thread yields again
/// 3. the helper stamps the start time and yields
/// 4. the benchmark thread stamps the end time on regaining the CPU
///
/// The first round trip primes the helper so the measured yield is pure
/// switch cost.
pub struct ContextSwitch<K, C> {
    kernel: K,
    clock: Arc<C>,
    stamp: Arc<HelperStamp>,
}

impl<K: ThreadControl, C: TimeSource> ContextSwitch<K, C> {
    /// Create the scenario
    pub fn new(kernel: K, clock: Arc<C>) -> Self {
        Self {
            kernel,
            clock,
            stamp: Arc::new(HelperStamp::new()),
        }
    }

    fn measure(&self, iteration: u32, stats: &mut StatsAccumulator) -> Result<()> {
        self.kernel.thread_start(ScenarioKind::ContextSwitch.slot())?;

        self.kernel.yield_now();
        self.kernel.yield_now();
        let end = self.clock.counter_get();

        let start = self
            .stamp
            .take()
            .ok_or(Error::MissingHelperStamp { iteration })?;
        let cycles = self.clock.cycles_get(start, end);
        stats.update(cycles, iteration);
        trace!(iteration, cycles, "context-switch sample");
        Ok(())
    }
}

impl<K: ThreadControl, C: TimeSource> Scenario for ContextSwitch<K, C> {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::ContextSwitch
    }

    fn gather(
        &mut self,
        priority: Priority,
        iteration: u32,
        stats: &mut StatsAccumulator,
    ) -> Result<()> {
        let kind = self.kind();
        // Equal priority is always representable
        let helper_priority = kind.helper_priority(priority).unwrap_or(priority);

        let kernel = self.kernel.clone();
        let clock = Arc::clone(&self.clock);
        let stamp = Arc::clone(&self.stamp);
        self.kernel.thread_create(
            kind.slot(),
            kind.helper_name(),
            helper_priority,
            Box::new(move || {
                kernel.yield_now();
                stamp.publish(clock.counter_get());
                kernel.yield_now();
            }),
        )?;

        let measured = self.measure(iteration, stats);
        self.kernel.thread_abort(kind.slot())?;
        measured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_take_once() {
        let stamp = HelperStamp::new();
        assert_eq!(stamp.take(), None);

        stamp.publish(Timestamp(77));
        assert_eq!(stamp.take(), Some(Timestamp(77)));
        assert_eq!(stamp.take(), None);
    }

    #[test]
    fn test_stamp_republish_overwrites() {
        let stamp = HelperStamp::new();
        stamp.publish(Timestamp(1));
        stamp.publish(Timestamp(2));
        assert_eq!(stamp.take(), Some(Timestamp(2)));
    }

    #[test]
    fn test_stamp_across_threads() {
        let stamp = Arc::new(HelperStamp::new());
        let producer = Arc::clone(&stamp);

        std::thread::spawn(move || producer.publish(Timestamp(9)))
            .join()
            .unwrap();

        assert_eq!(stamp.take(), Some(Timestamp(9)));
    }
}
