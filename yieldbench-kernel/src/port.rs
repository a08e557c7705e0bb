//! Collaborator interfaces consumed by the measurement harness
//!
//! The harness only ever talks to a scheduler through [`ThreadControl`] and
//! to a clock through [`TimeSource`]. The host implementations are
//! [`Kernel`](crate::Kernel) and [`HostClock`](crate::HostClock); tests
//! substitute their own.

use crate::error::Result;
use std::time::Duration;
use yieldbench_common::{Priority, Slot};

/// Entry function of a kernel thread
pub type ThreadEntry = Box<dyn FnOnce() + Send + 'static>;

/// Raw monotonic counter sample, in counter cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Counter value in cycles
    #[inline]
    pub fn cycles(self) -> u64 {
        self.0
    }
}

/// Thread and scheduler primitives
///
/// Every method acts on behalf of the calling kernel thread. Handles are
/// cheap to clone so helper thread bodies can capture one.
pub trait ThreadControl: Clone + Send + Sync + 'static {
    /// Register `entry` to run in `slot` at `priority`.
    ///
    /// Fails if the slot already holds a live thread.
    fn thread_create(
        &self,
        slot: Slot,
        name: &'static str,
        priority: Priority,
        entry: ThreadEntry,
    ) -> Result<()>;

    /// Make the thread in `slot` runnable
    fn thread_start(&self, slot: Slot) -> Result<()>;

    /// Terminate the thread in `slot` and free the slot.
    ///
    /// Calling this on a slot without a live thread is not an error.
    fn thread_abort(&self, slot: Slot) -> Result<()>;

    /// Change the calling thread's priority
    fn set_priority(&self, priority: Priority) -> Result<()>;

    /// Current priority of the calling thread
    fn priority(&self) -> Result<Priority>;

    /// Numerically largest (least urgent) priority the scheduler accepts
    fn lowest_priority(&self) -> Priority;

    /// Relinquish the CPU to the highest-priority runnable thread.
    ///
    /// Returns without a switch if no other thread of equal or higher
    /// priority is runnable.
    fn yield_now(&self);

    /// Leave the CPU for at least `duration`
    fn sleep(&self, duration: Duration);
}

/// Monotonic cycle counter and timing subsystem lifecycle
pub trait TimeSource: Send + Sync + 'static {
    /// One-time initialization of the timing subsystem
    fn timing_init(&self);

    /// Open the measurement window
    fn timing_start(&self);

    /// Close the measurement window
    fn timing_stop(&self);

    /// Sample the counter
    fn counter_get(&self) -> Timestamp;

    /// Cycles elapsed from `start` to `end`
    #[inline]
    fn cycles_get(&self, start: Timestamp, end: Timestamp) -> u64 {
        end.0.wrapping_sub(start.0)
    }

    /// Convert a cycle count to nanoseconds
    fn cycles_to_ns(&self, cycles: u64) -> u64;
}
