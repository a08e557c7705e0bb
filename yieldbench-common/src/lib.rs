// SPDX-License-Identifier: GPL-2.0-only
// Copyright (C) 2024 Ankit Kumar Pandey <ankitkpandey1@gmail.com>

//! # yieldbench-common
//!
//! Shared types for the yieldbench kernel and measurement harness.
//!
//! The harness measures the latency of a cooperative yield on a single
//! logical processor in two situations: when no other thread of equal or
//! higher priority is runnable (no context switch), and when one thread of
//! equal priority is runnable (full context switch).
//!
//! ## Conventions
//!
//! - **Priorities**: lower numeric value means higher scheduling priority
//! - **Slots**: helper threads live in a fixed set of reusable slots
//! - **Single CPU**: exactly one kernel thread executes at any time
//!
//! ## Non-Goals
//!
//! 1. **Multi-core measurement** - the protocol assumes one logical CPU
//! 2. **Higher statistical moments** - only min/max/running average
//! 3. **General benchmarking** - the two yield scenarios are all there is

#![no_std]

use core::fmt;

// ============================================================================
// Priorities
// ============================================================================

/// Scheduling priority. Lower value means higher priority.
pub type Priority = u8;

// ============================================================================
// Thread slots
// ============================================================================

/// Fixed logical identity of a reusable helper thread.
///
/// A slot holds at most one live thread. The thread in a slot is created
/// fresh for each measured iteration and aborted at its end.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Lower-priority helper used by the no-switch scenario
    Low = 0,

    /// Equal-priority helper used by the context-switch scenario
    Helper = 1,
}

impl Slot {
    /// Number of slots
    pub const COUNT: usize = 2;

    /// All slots, in index order
    pub const ALL: [Slot; Slot::COUNT] = [Slot::Low, Slot::Helper];

    /// Index of this slot in a slot table
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u32> for Slot {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Slot::Low),
            1 => Ok(Slot::Helper),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Low => f.write_str("LOW"),
            Slot::Helper => f.write_str("HELPER"),
        }
    }
}

// ============================================================================
// Thread lifecycle
// ============================================================================

/// Lifecycle state of a kernel thread control block
///
/// State transitions:
/// ```text
/// FREE → CREATED → READY ⇄ SLEEPING
///           │        │
///           │        └──→ EXITED
///           └─────────────→ FREE   (abort, from any state but running)
/// ```
///
/// Rules:
/// - A slot can be created only when it holds no live thread
/// - Only CREATED threads can be started
/// - Abort of a slot in FREE is a no-op
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadState {
    /// Slot holds no thread
    #[default]
    Free = 0,

    /// Thread registered but not yet runnable
    Created = 1,

    /// Thread is in the run queue (possibly running)
    Ready = 2,

    /// Thread is sleeping outside the run queue
    Sleeping = 3,

    /// Thread returned from its entry function
    Exited = 4,
}

impl ThreadState {
    /// Check if the slot holds a thread that has not finished
    #[inline]
    pub fn is_live(self) -> bool {
        matches!(
            self,
            ThreadState::Created | ThreadState::Ready | ThreadState::Sleeping
        )
    }

    /// Check if the thread may be started
    #[inline]
    pub fn can_start(self) -> bool {
        matches!(self, ThreadState::Created)
    }
}

// ============================================================================
// Scenarios
// ============================================================================

/// The two measurement protocols
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    /// Yield with only a lower-priority thread runnable
    NoSwitch = 0,

    /// Yield with an equal-priority thread runnable
    ContextSwitch = 1,
}

impl ScenarioKind {
    /// Text used in the report line
    pub const fn description(self) -> &'static str {
        match self {
            ScenarioKind::NoSwitch => "(no context switch)",
            ScenarioKind::ContextSwitch => "(context switch)",
        }
    }

    /// Slot the helper thread occupies
    pub const fn slot(self) -> Slot {
        match self {
            ScenarioKind::NoSwitch => Slot::Low,
            ScenarioKind::ContextSwitch => Slot::Helper,
        }
    }

    /// Name given to the helper thread
    pub const fn helper_name(self) -> &'static str {
        match self {
            ScenarioKind::NoSwitch => "low_priority_thread",
            ScenarioKind::ContextSwitch => "equal_priority_thread",
        }
    }

    /// Helper priority relative to the caller's priority.
    ///
    /// Returns `None` if the helper priority would overflow.
    pub const fn helper_priority(self, caller: Priority) -> Option<Priority> {
        match self {
            ScenarioKind::NoSwitch => caller.checked_add(1),
            ScenarioKind::ContextSwitch => Some(caller),
        }
    }

    /// Number of samples a phase records for a configured iteration count.
    ///
    /// The context-switch phase runs one iteration fewer than the
    /// no-switch phase.
    pub const fn samples(self, iterations: u32) -> u32 {
        match self {
            ScenarioKind::NoSwitch => iterations,
            ScenarioKind::ContextSwitch => iterations.saturating_sub(1),
        }
    }
}

// ============================================================================
// Runner state machine
// ============================================================================

/// Benchmark runner state
///
/// State transitions (strictly sequential, no branching):
/// ```text
/// INIT → RUNNING_SET1 → REPORT_SET1 → RUNNING_SET2 → REPORT_SET2 → DONE
/// ```
///
/// Rules:
/// - INIT lowers the caller's priority, once
/// - DONE is terminal; the runner cannot be restarted
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunnerState {
    /// Timing subsystem and priority not yet set up
    #[default]
    Init = 0,

    /// Gathering no-switch samples
    RunningSet1 = 1,

    /// Reporting no-switch statistics
    ReportSet1 = 2,

    /// Gathering context-switch samples
    RunningSet2 = 3,

    /// Reporting context-switch statistics
    ReportSet2 = 4,

    /// Run complete
    Done = 5,
}

impl RunnerState {
    /// The state that follows this one, `None` from DONE
    #[inline]
    pub fn next(self) -> Option<Self> {
        match self {
            RunnerState::Init => Some(RunnerState::RunningSet1),
            RunnerState::RunningSet1 => Some(RunnerState::ReportSet1),
            RunnerState::ReportSet1 => Some(RunnerState::RunningSet2),
            RunnerState::RunningSet2 => Some(RunnerState::ReportSet2),
            RunnerState::ReportSet2 => Some(RunnerState::Done),
            RunnerState::Done => None,
        }
    }

    /// Scenario measured or reported in this state
    #[inline]
    pub fn scenario(self) -> Option<ScenarioKind> {
        match self {
            RunnerState::RunningSet1 | RunnerState::ReportSet1 => Some(ScenarioKind::NoSwitch),
            RunnerState::RunningSet2 | RunnerState::ReportSet2 => {
                Some(ScenarioKind::ContextSwitch)
            }
            RunnerState::Init | RunnerState::Done => None,
        }
    }

    /// Check if samples are gathered in this state
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, RunnerState::RunningSet1 | RunnerState::RunningSet2)
    }

    /// Check if this is the terminal state
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, RunnerState::Done)
    }
}

// ============================================================================
// Configuration constants
// ============================================================================

/// Configuration constants
pub mod config {
    use super::Priority;

    /// Upper bound on priority levels (one bit per level in the run queue cache)
    pub const MAX_PRIORITIES: u8 = 32;

    /// Default number of priority levels
    pub const NUM_PRIORITIES: u8 = 16;

    /// Lowest scheduling priority (numerically largest)
    pub const LOWEST_PRIORITY: Priority = NUM_PRIORITIES - 1;

    /// Levels between the benchmark thread and the lowest priority
    pub const MAIN_PRIORITY_OFFSET: Priority = 2;

    /// Priority of the benchmark thread with the default level count
    pub const MAIN_PRIORITY: Priority = LOWEST_PRIORITY - MAIN_PRIORITY_OFFSET;

    /// Samples gathered by the no-switch phase
    pub const ITERATIONS: u32 = 1000;

    /// Settle delay after each measurement phase in milliseconds
    pub const IDLE_TIME_MS: u64 = 50;
}

// ============================================================================
// Tests
// ============================================================================
