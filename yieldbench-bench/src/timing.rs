//! Scoped timing subsystem session
//!
//! The measurement window must be closed however the run ends, so the
//! runner holds a [`TimingSession`] and lets `Drop` issue `timing_stop`.

use std::sync::Arc;
use tracing::debug;
use yieldbench_kernel::TimeSource;

/// Timing subsystem session
///
/// Created by [`TimingSession::init`], opened by [`TimingSession::start`],
/// and closed when dropped.
pub struct TimingSession<C: TimeSource> {
    clock: Arc<C>,
    started: bool,
}

impl<C: TimeSource> TimingSession<C> {
    /// Initialize the timing subsystem
    pub fn init(clock: Arc<C>) -> Self {
        clock.timing_init();
        Self {
            clock,
            started: false,
        }
    }

    /// Open the measurement window. Starting twice is a no-op.
    pub fn start(&mut self) {
        if !self.started {
            self.clock.timing_start();
            self.started = true;
            debug!("measurement window open");
        }
    }

    /// Close the measurement window
    pub fn stop(self) {
        drop(self);
    }
}

impl<C: TimeSource> Drop for TimingSession<C> {
    fn drop(&mut self) {
        if self.started {
            self.clock.timing_stop();
            debug!("measurement window closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use yieldbench_kernel::Timestamp;

    #[derive(Default)]
    struct CountingClock {
        inits: AtomicU32,
        starts: AtomicU32,
        stops: AtomicU32,
    }

    impl TimeSource for CountingClock {
        fn timing_init(&self) {
            self.inits.fetch_add(1, Ordering::Relaxed);
        }
        fn timing_start(&self) {
            self.starts.fetch_add(1, Ordering::Relaxed);
        }
        fn timing_stop(&self) {
            self.stops.fetch_add(1, Ordering::Relaxed);
        }
        fn counter_get(&self) -> Timestamp {
            Timestamp(0)
        }
        fn cycles_to_ns(&self, cycles: u64) -> u64 {
            cycles
        }
    }

    fn counts(clock: &CountingClock) -> (u32, u32, u32) {
        (
            clock.inits.load(Ordering::Relaxed),
            clock.starts.load(Ordering::Relaxed),
            clock.stops.load(Ordering::Relaxed),
        )
    }

    #[test]
    fn test_start_stop() {
        let clock = Arc::new(CountingClock::default());

        let mut session = TimingSession::init(clock.clone());
        assert_eq!(counts(&clock), (1, 0, 0));

        session.start();
        session.start();
        assert_eq!(counts(&clock), (1, 1, 0));

        session.stop();
        assert_eq!(counts(&clock), (1, 1, 1));
    }

    #[test]
    fn test_drop_closes_window() {
        let clock = Arc::new(CountingClock::default());
        {
            let mut session = TimingSession::init(clock.clone());
            session.start();
        }
        assert_eq!(counts(&clock), (1, 1, 1));
    }

    #[test]
    fn test_unstarted_session_does_not_stop() {
        let clock = Arc::new(CountingClock::default());
        drop(TimingSession::init(clock.clone()));
        assert_eq!(counts(&clock), (1, 0, 0));
    }
}
