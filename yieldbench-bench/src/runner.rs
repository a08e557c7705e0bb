//! Benchmark sequencing
//!
//! [`BenchmarkRunner`] walks the [`RunnerState`] machine:
//!
//! ```text
//! INIT -> RUNNING_SET1 -> REPORT_SET1 -> RUNNING_SET2 -> REPORT_SET2 -> DONE
//! ```
//!
//! Each state does its work in one [`BenchmarkRunner::step`]. Any error
//! ends the run in DONE with the timing window closed.

use crate::config::BenchConfig;
use crate::error::{Error, Result};
use crate::scenario::{ContextSwitch, NoSwitch, Scenario};
use crate::stats::StatsAccumulator;
use crate::timing::TimingSession;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use yieldbench_common::{Priority, RunnerState, ScenarioKind};
use yieldbench_kernel::{ThreadControl, TimeSource};

/// Statistics of one scenario, converted to nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioReport {
    /// Scenario measured
    pub kind: ScenarioKind,
    /// Samples folded into the statistics
    pub samples: u32,
    /// Smallest sample
    pub min_ns: u64,
    /// Largest sample
    pub max_ns: u64,
    /// Running average
    pub avg_ns: u64,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Yield {}: min {} ns, max {} ns, avg {} ns",
            self.kind.description(),
            self.min_ns,
            self.max_ns,
            self.avg_ns
        )
    }
}

/// Both report lines of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Yield without a context switch
    pub no_switch: ScenarioReport,
    /// Yield across a context switch
    pub context_switch: ScenarioReport,
}

impl RunSummary {
    /// Reports in the order they were produced
    pub fn reports(&self) -> [&ScenarioReport; 2] {
        [&self.no_switch, &self.context_switch]
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.no_switch)?;
        write!(f, "{}", self.context_switch)
    }
}

/// Sequences the two measurement phases
///
/// The runner must be driven from the kernel thread it benchmarks. It is
/// single use: once DONE, further steps fail with
/// [`Error::AlreadyFinished`].
pub struct BenchmarkRunner<K: ThreadControl, C: TimeSource> {
    kernel: K,
    clock: Arc<C>,
    config: BenchConfig,
    main_priority: Priority,
    state: RunnerState,
    stats: StatsAccumulator,
    timing: Option<TimingSession<C>>,
    reports: Vec<ScenarioReport>,
}

impl<K: ThreadControl, C: TimeSource> BenchmarkRunner<K, C> {
    /// Create a runner in INIT
    pub fn new(kernel: K, clock: Arc<C>, config: BenchConfig) -> Self {
        let main_priority = config.resolve_priority(kernel.lowest_priority());
        Self {
            kernel,
            clock,
            config,
            main_priority,
            state: RunnerState::Init,
            stats: StatsAccumulator::new(),
            timing: None,
            reports: Vec::with_capacity(2),
        }
    }

    /// Current state
    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Configuration in use
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Priority the benchmark thread runs at
    pub fn main_priority(&self) -> Priority {
        self.main_priority
    }

    /// Reports produced so far
    pub fn reports(&self) -> &[ScenarioReport] {
        &self.reports
    }

    /// Run every remaining state and return both reports
    pub fn run(&mut self) -> Result<RunSummary> {
        if self.state.is_terminal() {
            return Err(Error::AlreadyFinished);
        }
        while !self.state.is_terminal() {
            self.step()?;
        }
        match self.reports.as_slice() {
            [no_switch, context_switch] => Ok(RunSummary {
                no_switch: *no_switch,
                context_switch: *context_switch,
            }),
            _ => Err(Error::AlreadyFinished),
        }
    }

    /// Do the current state's work and advance.
    ///
    /// Returns the report produced by a REPORT state.
    pub fn step(&mut self) -> Result<Option<ScenarioReport>> {
        let result = self.execute();
        match result {
            Ok(report) => {
                if let Some(next) = self.state.next() {
                    debug!(from = ?self.state, to = ?next, "runner transition");
                    self.state = next;
                }
                Ok(report)
            }
            Err(Error::AlreadyFinished) => Err(Error::AlreadyFinished),
            Err(e) => {
                warn!(state = ?self.state, error = %e, "benchmark aborted");
                self.timing = None;
                self.state = RunnerState::Done;
                Err(e)
            }
        }
    }

    fn execute(&mut self) -> Result<Option<ScenarioReport>> {
        match self.state {
            RunnerState::Init => {
                self.timing = Some(TimingSession::init(Arc::clone(&self.clock)));
                self.kernel.set_priority(self.main_priority)?;
                info!(
                    priority = self.main_priority,
                    iterations = self.config.iterations,
                    "starting thread yield benchmark"
                );
                Ok(None)
            }
            RunnerState::RunningSet1 => {
                if let Some(timing) = self.timing.as_mut() {
                    timing.start();
                }
                let mut scenario = NoSwitch::new(self.kernel.clone(), Arc::clone(&self.clock));
                self.run_phase(&mut scenario)?;
                Ok(None)
            }
            RunnerState::RunningSet2 => {
                let mut scenario =
                    ContextSwitch::new(self.kernel.clone(), Arc::clone(&self.clock));
                self.run_phase(&mut scenario)?;
                if let Some(timing) = self.timing.take() {
                    timing.stop();
                }
                Ok(None)
            }
            RunnerState::ReportSet1 | RunnerState::ReportSet2 => {
                let kind = self
                    .state
                    .scenario()
                    .unwrap_or(ScenarioKind::NoSwitch);
                Ok(Some(self.report(kind)))
            }
            RunnerState::Done => Err(Error::AlreadyFinished),
        }
    }

    fn run_phase<S: Scenario>(&mut self, scenario: &mut S) -> Result<()> {
        let kind = scenario.kind();
        let samples = kind.samples(self.config.iterations);
        debug!(?kind, samples, "measurement phase");

        self.stats.reset();
        for iteration in 1..=samples {
            self.check_priority()?;
            scenario.gather(self.main_priority, iteration, &mut self.stats)?;
        }

        self.kernel.sleep(self.config.idle_time);
        Ok(())
    }

    fn check_priority(&self) -> Result<()> {
        let expected = self.main_priority;
        let actual = self.kernel.priority()?;
        if actual != expected {
            return Err(Error::PriorityDrift { expected, actual });
        }
        Ok(())
    }

    fn report(&mut self, kind: ScenarioKind) -> ScenarioReport {
        let summary = self.stats.report();
        let report = ScenarioReport {
            kind,
            samples: summary.count,
            min_ns: self.clock.cycles_to_ns(summary.min),
            max_ns: self.clock.cycles_to_ns(summary.max),
            avg_ns: self.clock.cycles_to_ns(summary.avg),
        };
        info!(
            scenario = kind.description(),
            samples = report.samples,
            min_ns = report.min_ns,
            max_ns = report.max_ns,
            avg_ns = report.avg_ns,
            "scenario complete"
        );
        self.reports.push(report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(kind: ScenarioKind, min: u64, max: u64, avg: u64) -> ScenarioReport {
        ScenarioReport {
            kind,
            samples: 3,
            min_ns: min,
            max_ns: max,
            avg_ns: avg,
        }
    }

    #[test]
    fn test_report_line_format() {
        assert_eq!(
            report(ScenarioKind::NoSwitch, 5, 25, 15).to_string(),
            "Yield (no context switch): min 5 ns, max 25 ns, avg 15 ns"
        );
        assert_eq!(
            report(ScenarioKind::ContextSwitch, 0, 0, 0).to_string(),
            "Yield (context switch): min 0 ns, max 0 ns, avg 0 ns"
        );
    }

    #[test]
    fn test_summary_prints_both_lines() {
        let summary = RunSummary {
            no_switch: report(ScenarioKind::NoSwitch, 1, 2, 1),
            context_switch: report(ScenarioKind::ContextSwitch, 3, 4, 3),
        };
        let text = summary.to_string();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Yield (no context switch)"));
        assert!(lines[1].starts_with("Yield (context switch)"));
        assert_eq!(summary.reports()[1].kind, ScenarioKind::ContextSwitch);
    }
}
