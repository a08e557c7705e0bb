//! Running min/max/average of sampled durations
//!
//! Samples are counter cycles. The average is folded in incrementally so
//! that long runs never accumulate a sum.

/// Snapshot of the accumulated statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSummary {
    /// Smallest sample
    pub min: u64,
    /// Largest sample
    pub max: u64,
    /// Running average
    pub avg: u64,
    /// Samples folded in since the last reset
    pub count: u32,
}

/// Incremental statistics over one scenario run
///
/// Owned by the benchmark thread; never shared.
#[derive(Debug, Clone)]
pub struct StatsAccumulator {
    min: u64,
    max: u64,
    avg: u64,
    count: u32,
}

impl StatsAccumulator {
    /// Create an empty accumulator
    pub const fn new() -> Self {
        Self {
            min: u64::MAX,
            max: 0,
            avg: 0,
            count: 0,
        }
    }

    /// Clear all statistics
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Fold in `sample` as the `iteration`-th sample since the last reset.
    ///
    /// `iteration` is 1-based and must equal the number of updates since
    /// the last reset, including this one. A different value gives a wrong
    /// (but well-defined) average.
    pub fn update(&mut self, sample: u64, iteration: u32) {
        debug_assert!(iteration >= 1, "iteration index is 1-based");

        // avg <- avg + (sample - avg) / i, truncating toward zero
        let step = (sample as i128 - self.avg as i128) / iteration.max(1) as i128;
        self.avg = (self.avg as i128 + step) as u64;

        if sample < self.min {
            self.min = sample;
        }
        if sample > self.max {
            self.max = sample;
        }
        self.count += 1;
    }

    /// Samples folded in since the last reset
    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Check if no sample has been folded in since the last reset
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Read the statistics. An empty accumulator reports all zeros.
    pub fn report(&self) -> StatsSummary {
        if self.is_empty() {
            return StatsSummary::default();
        }
        StatsSummary {
            min: self.min,
            max: self.max,
            avg: self.avg,
            count: self.count,
        }
    }
}

impl Default for StatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn feed(samples: &[u64]) -> StatsAccumulator {
        let mut stats = StatsAccumulator::new();
        for (i, &sample) in samples.iter().enumerate() {
            stats.update(sample, i as u32 + 1);
        }
        stats
    }

    #[test]
    fn test_known_sequence() {
        let summary = feed(&[10, 20, 15, 5, 25]).report();

        assert_eq!(summary.min, 5);
        assert_eq!(summary.max, 25);
        assert_eq!(summary.avg, 15);
        assert_eq!(summary.count, 5);
    }

    #[test]
    fn test_empty_report_is_zero() {
        let mut stats = feed(&[7, 9]);
        stats.reset();

        assert!(stats.is_empty());
        assert_eq!(stats.report(), StatsSummary::default());
    }

    #[test]
    fn test_single_sample() {
        let summary = feed(&[42]).report();
        assert_eq!((summary.min, summary.max, summary.avg), (42, 42, 42));
    }

    #[test]
    fn test_reset_starts_new_cycle() {
        let mut stats = feed(&[1_000, 2_000]);
        stats.reset();
        stats.update(3, 1);

        let summary = stats.report();
        assert_eq!((summary.min, summary.max, summary.avg), (3, 3, 3));
        assert_eq!(summary.count, 1);
    }

    #[test]
    fn test_decreasing_samples_truncate_toward_zero() {
        // 15 + (5 - 15) / 4 = 15 - 2
        let summary = feed(&[10, 20, 15, 5]).report();
        assert_eq!(summary.avg, 13);
    }

    #[test]
    fn test_extreme_values_do_not_overflow() {
        let summary = feed(&[u64::MAX, 0, u64::MAX]).report();

        assert_eq!(summary.min, 0);
        assert_eq!(summary.max, u64::MAX);
        assert!(summary.avg > u64::MAX / 2);
    }

    proptest! {
        #[test]
        fn min_max_are_exact(samples in prop::collection::vec(0u64..1_000_000, 1..200)) {
            let summary = feed(&samples).report();
            prop_assert_eq!(summary.min, *samples.iter().min().unwrap());
            prop_assert_eq!(summary.max, *samples.iter().max().unwrap());
            prop_assert_eq!(summary.count as usize, samples.len());
        }

        #[test]
        fn average_tracks_mean(samples in prop::collection::vec(0u64..1_000_000, 1..200)) {
            let summary = feed(&samples).report();
            let n = samples.len() as f64;
            let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / n;

            // Each truncating step loses less than one cycle
            prop_assert!((summary.avg as f64 - mean).abs() <= (n + 1.0) / 2.0);
            prop_assert!(summary.min <= summary.avg && summary.avg <= summary.max);
        }

        #[test]
        fn constant_samples_average_exactly(value in 0u64..u64::MAX, len in 1usize..100) {
            let summary = feed(&vec![value; len]).report();
            prop_assert_eq!(summary.avg, value);
        }
    }
}
