//! Instrumented collaborators shared by the integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use yieldbench_common::{Priority, ScenarioKind, Slot};
use yieldbench_kernel::{Kernel, Result, ThreadControl, ThreadEntry, TimeSource, Timestamp};

/// Which kernel thread performed an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Who {
    Main,
    Helper,
}

impl Who {
    /// Identify the calling OS thread by the name the kernel gave it
    pub fn current() -> Self {
        let helpers = [
            ScenarioKind::NoSwitch.helper_name(),
            ScenarioKind::ContextSwitch.helper_name(),
        ];
        match std::thread::current().name() {
            Some(name) if helpers.contains(&name) => Who::Helper,
            _ => Who::Main,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Create(Slot, Priority),
    Start(Slot),
    Abort(Slot),
    SetPriority(Priority),
    Priority(Priority),
    Yield(Who),
    Sleep,
    Counter(Who),
    TimingInit,
    TimingStart,
    TimingStop,
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// [`Kernel`] wrapper that records every call
#[derive(Clone)]
pub struct RecordingKernel {
    inner: Kernel,
    log: EventLog,
    reported_priority: Option<Priority>,
    yields_dropped: bool,
}

impl RecordingKernel {
    pub fn new(inner: Kernel, log: EventLog) -> Self {
        Self {
            inner,
            log,
            reported_priority: None,
            yields_dropped: false,
        }
    }

    /// Report `priority` from [`ThreadControl::priority`] regardless of
    /// the real value
    pub fn with_reported_priority(mut self, priority: Priority) -> Self {
        self.reported_priority = Some(priority);
        self
    }

    /// Record yields without handing over the CPU
    pub fn with_dropped_yields(mut self) -> Self {
        self.yields_dropped = true;
        self
    }

    pub fn kernel(&self) -> &Kernel {
        &self.inner
    }

    fn record(&self, event: Event) {
        self.log.lock().push(event);
    }
}

impl ThreadControl for RecordingKernel {
    fn thread_create(
        &self,
        slot: Slot,
        name: &'static str,
        priority: Priority,
        entry: ThreadEntry,
    ) -> Result<()> {
        self.record(Event::Create(slot, priority));
        self.inner.thread_create(slot, name, priority, entry)
    }

    fn thread_start(&self, slot: Slot) -> Result<()> {
        self.record(Event::Start(slot));
        self.inner.thread_start(slot)
    }

    fn thread_abort(&self, slot: Slot) -> Result<()> {
        self.record(Event::Abort(slot));
        self.inner.thread_abort(slot)
    }

    fn set_priority(&self, priority: Priority) -> Result<()> {
        self.record(Event::SetPriority(priority));
        self.inner.set_priority(priority)
    }

    fn priority(&self) -> Result<Priority> {
        let priority = match self.reported_priority {
            Some(priority) => priority,
            None => self.inner.priority()?,
        };
        self.record(Event::Priority(priority));
        Ok(priority)
    }

    fn lowest_priority(&self) -> Priority {
        self.inner.lowest_priority()
    }

    fn yield_now(&self) {
        self.record(Event::Yield(Who::current()));
        if !self.yields_dropped {
            self.inner.yield_now();
        }
    }

    fn sleep(&self, duration: Duration) {
        self.record(Event::Sleep);
        self.inner.sleep(duration);
    }
}

/// Clock that replays scripted counter values, then counts up by one
pub struct ScriptedClock {
    script: Mutex<VecDeque<u64>>,
    fallback: AtomicU64,
    log: EventLog,
}

impl ScriptedClock {
    pub fn new(log: EventLog) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: AtomicU64::new(1_000_000),
            log,
        }
    }

    /// Script `(start, end)` counter pairs producing `deltas`
    pub fn with_deltas(self, deltas: &[u64]) -> Self {
        {
            let mut script = self.script.lock();
            for &delta in deltas {
                script.push_back(100);
                script.push_back(100 + delta);
            }
        }
        self
    }
}

impl TimeSource for ScriptedClock {
    fn timing_init(&self) {
        self.log.lock().push(Event::TimingInit);
    }

    fn timing_start(&self) {
        self.log.lock().push(Event::TimingStart);
    }

    fn timing_stop(&self) {
        self.log.lock().push(Event::TimingStop);
    }

    fn counter_get(&self) -> Timestamp {
        self.log.lock().push(Event::Counter(Who::current()));
        let value = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.fetch_add(1, Ordering::Relaxed));
        Timestamp(value)
    }

    fn cycles_to_ns(&self, cycles: u64) -> u64 {
        cycles
    }
}

pub fn count(log: &EventLog, event: &Event) -> usize {
    log.lock().iter().filter(|e| *e == event).count()
}
