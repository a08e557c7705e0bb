//! Benchmark configuration

use std::time::Duration;
use yieldbench_common::{config, Priority};

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Samples gathered by the no-switch phase (the context-switch phase
    /// gathers one fewer)
    pub iterations: u32,

    /// Settle delay after each measurement phase
    pub idle_time: Duration,

    /// Priority the benchmark thread runs at for the whole run.
    ///
    /// `None` selects two levels above the scheduler's lowest priority,
    /// leaving room for the no-switch helper below it.
    pub main_priority: Option<Priority>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: config::ITERATIONS,
            idle_time: Duration::from_millis(config::IDLE_TIME_MS),
            main_priority: None,
        }
    }
}

impl BenchConfig {
    /// Set the iteration count
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the inter-phase settle delay
    pub fn idle_time(mut self, idle_time: Duration) -> Self {
        self.idle_time = idle_time;
        self
    }

    /// Set the benchmark thread priority
    pub fn main_priority(mut self, priority: Priority) -> Self {
        self.main_priority = Some(priority);
        self
    }

    /// Benchmark thread priority on a scheduler whose lowest level is
    /// `lowest`
    pub fn resolve_priority(&self, lowest: Priority) -> Priority {
        self.main_priority
            .unwrap_or_else(|| lowest.saturating_sub(config::MAIN_PRIORITY_OFFSET))
    }
}
