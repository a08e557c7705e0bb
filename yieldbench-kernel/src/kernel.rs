//! Simulated uniprocessor kernel
//!
//! Kernel threads are backed by OS threads, but only the thread holding the
//! virtual CPU executes; every other thread is parked on its own condition
//! variable until the scheduler hands the CPU to it. Scheduling decisions
//! are made only at scheduling points: yield, thread start, priority
//! change, sleep and thread exit.

use crate::affinity::get_tid;
use crate::error::{Error, Result};
use crate::port::{ThreadControl, ThreadEntry};
use crate::runqueue::RunQueue;
use crate::thread::{Aborted, Tcb, ThreadId, NUM_THREADS};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};
use yieldbench_common::{config, Priority, Slot, ThreadState};

/// Kernel configuration
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Number of priority levels (1..=32)
    pub num_priorities: u8,

    /// Initial priority of the thread that builds the kernel
    pub main_priority: Priority,

    /// Name of the thread that builds the kernel
    pub main_name: &'static str,
}

impl KernelConfig {
    /// Numerically largest (lowest) priority
    pub fn lowest_priority(&self) -> Priority {
        self.num_priorities.saturating_sub(1)
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            num_priorities: config::NUM_PRIORITIES,
            main_priority: 0,
            main_name: "main",
        }
    }
}

/// Kernel builder
pub struct Builder {
    config: KernelConfig,
}

impl Builder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: KernelConfig::default(),
        }
    }

    /// Set the number of priority levels
    pub fn num_priorities(mut self, n: u8) -> Self {
        self.config.num_priorities = n;
        self
    }

    /// Set the initial priority of the calling thread
    pub fn main_priority(mut self, priority: Priority) -> Self {
        self.config.main_priority = priority;
        self
    }

    /// Set the name the calling thread is known by
    pub fn main_name(mut self, name: &'static str) -> Self {
        self.config.main_name = name;
        self
    }

    /// Build the kernel.
    ///
    /// The calling thread becomes the kernel's main thread and holds the
    /// CPU when this returns.
    pub fn build(self) -> Result<Kernel> {
        let config = self.config;
        if config.num_priorities == 0 || config.num_priorities > config::MAX_PRIORITIES {
            return Err(Error::InvalidConfig(format!(
                "num_priorities must be in 1..={}, got {}",
                config::MAX_PRIORITIES,
                config.num_priorities
            )));
        }
        if config.main_priority >= config.num_priorities {
            return Err(Error::InvalidPriority(config.main_priority));
        }
        Ok(Kernel::new(config))
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// Kernel statistics
#[derive(Debug, Default)]
pub struct KernelStats {
    /// Total yield calls
    pub yields: AtomicU64,
    /// Hand-offs of the CPU from one thread to another
    pub context_switches: AtomicU64,
    /// Threads created
    pub threads_created: AtomicU64,
    /// Live threads aborted
    pub threads_aborted: AtomicU64,
}

struct Sched {
    threads: [Tcb; NUM_THREADS],
    runqueue: RunQueue,
    /// Thread holding the CPU, `None` while idle
    current: Option<ThreadId>,
}

impl Sched {
    #[inline]
    fn tcb(&self, id: ThreadId) -> &Tcb {
        &self.threads[id.index()]
    }

    #[inline]
    fn tcb_mut(&mut self, id: ThreadId) -> &mut Tcb {
        &mut self.threads[id.index()]
    }

    /// Kernel thread backed by the calling OS thread
    fn caller(&self) -> Option<ThreadId> {
        let os_thread = thread::current().id();
        let id = self
            .threads
            .iter()
            .position(|t| t.os_thread == Some(os_thread) && t.state == ThreadState::Ready)
            .map(ThreadId)?;
        debug_assert_eq!(
            self.current,
            Some(id),
            "kernel call from a thread that does not hold the CPU"
        );
        Some(id)
    }
}

struct Inner {
    config: KernelConfig,
    sched: Mutex<Sched>,
    wakeups: [Condvar; NUM_THREADS],
    stats: KernelStats,
}

impl Inner {
    /// Give the CPU to `next` (or idle it)
    fn switch_to(&self, sched: &mut Sched, next: Option<ThreadId>) {
        let prev = sched.current;
        sched.current = next;
        match next {
            Some(next) if prev != Some(next) => {
                if prev.is_some() {
                    self.stats.context_switches.fetch_add(1, Ordering::Relaxed);
                }
                trace!(from = ?prev, to = sched.tcb(next).name, "context switch");
                self.wakeups[next.index()].notify_one();
            }
            Some(_) => {}
            None => trace!("cpu idle"),
        }
    }

    /// Block until `me` holds the CPU.
    ///
    /// Unwinds out of the calling thread if it is aborted while waiting.
    fn wait_for_cpu<'a>(
        &self,
        mut sched: MutexGuard<'a, Sched>,
        me: ThreadId,
        generation: u64,
    ) -> MutexGuard<'a, Sched> {
        loop {
            if sched.tcb(me).generation != generation {
                drop(sched);
                panic::resume_unwind(Box::new(Aborted));
            }
            if sched.current == Some(me) {
                return sched;
            }
            self.wakeups[me.index()].wait(&mut sched);
        }
    }

    /// Scheduling point for the running thread `me`
    fn reschedule(&self, mut sched: MutexGuard<'_, Sched>, me: ThreadId) {
        let next = sched.runqueue.next();
        if next == Some(me) {
            return;
        }
        let generation = sched.tcb(me).generation;
        self.switch_to(&mut sched, next);
        drop(self.wait_for_cpu(sched, me, generation));
    }

    /// The running thread `me` returned from its entry function
    fn exit(&self, me: ThreadId, generation: u64) {
        let mut sched = self.sched.lock();
        if sched.tcb(me).generation != generation {
            return;
        }
        let priority = sched.tcb(me).priority;
        sched.tcb_mut(me).state = ThreadState::Exited;
        sched.runqueue.remove(me, priority);
        debug!(thread = sched.tcb(me).name, "thread exited");

        let next = sched.runqueue.next();
        self.switch_to(&mut sched, next);
    }
}

/// Body of every OS thread backing a slot
fn thread_main(inner: Arc<Inner>, me: ThreadId, generation: u64) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut sched = inner.wait_for_cpu(inner.sched.lock(), me, generation);
        let tcb = sched.tcb_mut(me);
        tcb.tid = Some(get_tid());
        let entry = tcb.entry.take();
        debug!(thread = tcb.name, tid = ?tcb.tid, "thread running");
        drop(sched);

        if let Some(entry) = entry {
            entry();
        }
    }));

    match outcome {
        Ok(()) => inner.exit(me, generation),
        Err(payload) if payload.is::<Aborted>() => {
            trace!(slot = ?me.slot(), "aborted thread unwound");
        }
        Err(payload) => {
            error!(slot = ?me.slot(), "kernel thread panicked");
            inner.exit(me, generation);
            panic::resume_unwind(payload);
        }
    }
}

/// Handle to the simulated uniprocessor kernel
///
/// Cloning is cheap; all clones refer to the same scheduler.
#[derive(Clone)]
pub struct Kernel {
    inner: Arc<Inner>,
}

impl Kernel {
    fn new(config: KernelConfig) -> Self {
        let mut threads: [Tcb; NUM_THREADS] = std::array::from_fn(|_| Tcb::free());
        let main = &mut threads[ThreadId::MAIN.index()];
        main.name = config.main_name;
        main.priority = config.main_priority;
        main.state = ThreadState::Ready;
        main.os_thread = Some(thread::current().id());
        main.tid = Some(get_tid());

        let mut runqueue = RunQueue::new(config.num_priorities);
        runqueue.add(ThreadId::MAIN, config.main_priority);

        info!(
            num_priorities = config.num_priorities,
            main_priority = config.main_priority,
            "kernel started"
        );

        Self {
            inner: Arc::new(Inner {
                sched: Mutex::new(Sched {
                    threads,
                    runqueue,
                    current: Some(ThreadId::MAIN),
                }),
                wakeups: std::array::from_fn(|_| Condvar::new()),
                stats: KernelStats::default(),
                config,
            }),
        }
    }

    /// Get the kernel configuration
    pub fn config(&self) -> &KernelConfig {
        &self.inner.config
    }

    /// Get kernel statistics
    pub fn stats(&self) -> &KernelStats {
        &self.inner.stats
    }

    /// Lifecycle state of the thread in `slot`
    pub fn thread_state(&self, slot: Slot) -> ThreadState {
        self.inner.sched.lock().tcb(ThreadId::from(slot)).state
    }

    /// Abort every slot
    pub fn shutdown(&self) -> Result<()> {
        for slot in Slot::ALL {
            self.thread_abort(slot)?;
        }
        info!("kernel shutdown complete");
        Ok(())
    }

    fn check_priority(&self, priority: Priority) -> Result<()> {
        if priority >= self.inner.config.num_priorities {
            return Err(Error::InvalidPriority(priority));
        }
        Ok(())
    }
}

impl ThreadControl for Kernel {
    fn thread_create(
        &self,
        slot: Slot,
        name: &'static str,
        priority: Priority,
        entry: ThreadEntry,
    ) -> Result<()> {
        self.check_priority(priority)?;

        let mut sched = self.inner.sched.lock();
        let tcb = sched.tcb_mut(ThreadId::from(slot));
        if tcb.state.is_live() {
            return Err(Error::SlotOccupied(slot));
        }

        // Reap a thread that ran to completion
        let stale = tcb.handle.take();

        tcb.name = name;
        tcb.priority = priority;
        tcb.state = ThreadState::Created;
        tcb.entry = Some(entry);
        tcb.os_thread = None;
        tcb.tid = None;
        drop(sched);

        if let Some(handle) = stale {
            let _ = handle.join();
        }

        self.inner
            .stats
            .threads_created
            .fetch_add(1, Ordering::Relaxed);
        debug!(%slot, thread = name, priority, "thread created");
        Ok(())
    }

    fn thread_start(&self, slot: Slot) -> Result<()> {
        let id = ThreadId::from(slot);
        let mut sched = self.inner.sched.lock();
        let me = sched.caller().ok_or(Error::ForeignThread)?;

        let tcb = sched.tcb(id);
        if !tcb.state.can_start() {
            return Err(Error::NotCreated(slot));
        }
        let (name, priority, generation) = (tcb.name, tcb.priority, tcb.generation);

        let inner = Arc::clone(&self.inner);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || thread_main(inner, id, generation))?;

        let tcb = sched.tcb_mut(id);
        tcb.os_thread = Some(handle.thread().id());
        tcb.handle = Some(handle);
        tcb.state = ThreadState::Ready;
        sched.runqueue.add(id, priority);
        debug!(%slot, thread = name, priority, "thread started");

        self.inner.reschedule(sched, me);
        Ok(())
    }

    fn thread_abort(&self, slot: Slot) -> Result<()> {
        let id = ThreadId::from(slot);
        let mut sched = self.inner.sched.lock();
        if sched.current == Some(id) {
            return Err(Error::AbortRunning(slot));
        }

        let (state, priority) = {
            let tcb = sched.tcb(id);
            (tcb.state, tcb.priority)
        };
        if state == ThreadState::Free {
            return Ok(());
        }
        if state == ThreadState::Ready {
            sched.runqueue.remove(id, priority);
        }

        let (entry, handle) = sched.tcb_mut(id).release();
        self.inner.wakeups[id.index()].notify_one();
        drop(sched);
        drop(entry);

        if state.is_live() {
            self.inner
                .stats
                .threads_aborted
                .fetch_add(1, Ordering::Relaxed);
        }
        debug!(%slot, ?state, "thread aborted");

        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(%slot, "aborted thread had panicked");
            }
        }
        Ok(())
    }

    fn set_priority(&self, priority: Priority) -> Result<()> {
        self.check_priority(priority)?;

        let mut sched = self.inner.sched.lock();
        let me = sched.caller().ok_or(Error::ForeignThread)?;
        let old = sched.tcb(me).priority;

        sched.runqueue.remove(me, old);
        sched.tcb_mut(me).priority = priority;
        sched.runqueue.add_head(me, priority);
        debug!(thread = sched.tcb(me).name, old, new = priority, "priority changed");

        self.inner.reschedule(sched, me);
        Ok(())
    }

    fn priority(&self) -> Result<Priority> {
        let sched = self.inner.sched.lock();
        let me = sched.caller().ok_or(Error::ForeignThread)?;
        Ok(sched.tcb(me).priority)
    }

    fn lowest_priority(&self) -> Priority {
        self.inner.config.lowest_priority()
    }

    fn yield_now(&self) {
        self.inner.stats.yields.fetch_add(1, Ordering::Relaxed);

        let mut sched = self.inner.sched.lock();
        let caller = sched.caller();
        let Some(me) = caller else {
            drop(sched);
            thread::yield_now();
            return;
        };

        let priority = sched.tcb(me).priority;
        sched.runqueue.advance_from(me, priority);
        self.inner.reschedule(sched, me);
    }

    fn sleep(&self, duration: Duration) {
        let mut sched = self.inner.sched.lock();
        let caller = sched.caller();
        let Some(me) = caller else {
            drop(sched);
            thread::sleep(duration);
            return;
        };

        let (priority, generation) = {
            let tcb = sched.tcb(me);
            (tcb.priority, tcb.generation)
        };
        sched.tcb_mut(me).state = ThreadState::Sleeping;
        sched.runqueue.remove(me, priority);
        let next = sched.runqueue.next();
        self.inner.switch_to(&mut sched, next);
        drop(sched);

        trace!(?duration, "sleeping");
        thread::sleep(duration);

        let mut sched = self.inner.sched.lock();
        if sched.tcb(me).generation != generation {
            drop(sched);
            panic::resume_unwind(Box::new(Aborted));
        }
        let priority = sched.tcb(me).priority;
        sched.tcb_mut(me).state = ThreadState::Ready;
        sched.runqueue.add(me, priority);
        if sched.current.is_none() {
            let next = sched.runqueue.next();
            self.inner.switch_to(&mut sched, next);
        }
        drop(self.inner.wait_for_cpu(sched, me, generation));
    }
}
