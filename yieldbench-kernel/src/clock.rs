//! Host time source
//!
//! A monotonic counter running at 1 GHz (one cycle per nanosecond),
//! derived from [`Instant`].

use crate::port::{TimeSource, Timestamp};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::debug;

/// Counter frequency of [`HostClock`]
pub const HOST_CLOCK_HZ: u64 = 1_000_000_000;

/// Monotonic host counter
#[derive(Debug)]
pub struct HostClock {
    epoch: Instant,
    frequency_hz: u64,
    initialized: AtomicBool,
    active: AtomicBool,
}

impl HostClock {
    /// Create a clock whose counter starts at zero now
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            frequency_hz: HOST_CLOCK_HZ,
            initialized: AtomicBool::new(false),
            active: AtomicBool::new(false),
        }
    }

    /// Counter frequency in Hz
    pub fn frequency_hz(&self) -> u64 {
        self.frequency_hz
    }

    /// Check if the measurement window is open
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for HostClock {
    fn timing_init(&self) {
        if !self.initialized.swap(true, Ordering::AcqRel) {
            debug!(frequency_hz = self.frequency_hz, "timing initialized");
        }
    }

    fn timing_start(&self) {
        self.active.store(true, Ordering::Release);
        debug!("timing started");
    }

    fn timing_stop(&self) {
        self.active.store(false, Ordering::Release);
        debug!("timing stopped");
    }

    #[inline]
    fn counter_get(&self) -> Timestamp {
        Timestamp(self.epoch.elapsed().as_nanos() as u64)
    }

    #[inline]
    fn cycles_to_ns(&self, cycles: u64) -> u64 {
        (cycles as u128 * 1_000_000_000 / self.frequency_hz as u128) as u64
    }
}
