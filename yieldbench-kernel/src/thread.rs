//! Thread control blocks
//!
//! The thread table is a fixed arena: entry 0 belongs to the thread that
//! built the kernel, the remaining entries are indexed by [`Slot`].

use crate::port::ThreadEntry;
use std::thread::JoinHandle;
use yieldbench_common::{Priority, Slot, ThreadState};

/// Number of entries in the thread table
pub(crate) const NUM_THREADS: usize = 1 + Slot::COUNT;

/// Index into the thread table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ThreadId(pub usize);

impl ThreadId {
    /// The thread that built the kernel
    pub const MAIN: ThreadId = ThreadId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }

    /// Slot backing this thread, `None` for main
    pub fn slot(self) -> Option<Slot> {
        match self.0 {
            0 => None,
            n => Slot::try_from((n - 1) as u32).ok(),
        }
    }
}

impl From<Slot> for ThreadId {
    fn from(slot: Slot) -> Self {
        ThreadId(slot.index() + 1)
    }
}

/// Unwind payload used to terminate an aborted thread
pub(crate) struct Aborted;

/// Thread control block
pub(crate) struct Tcb {
    pub name: &'static str,
    pub priority: Priority,
    pub state: ThreadState,

    /// Bumped on every abort; a blocked thread that sees a different
    /// value than the one it started with has been aborted
    pub generation: u64,

    /// Entry function, taken when the thread first runs
    pub entry: Option<ThreadEntry>,

    /// Backing OS thread
    pub handle: Option<JoinHandle<()>>,

    /// Identity of the backing OS thread
    pub os_thread: Option<std::thread::ThreadId>,

    /// OS thread ID (TID), known once the thread has run
    pub tid: Option<u32>,
}

impl Tcb {
    pub const fn free() -> Self {
        Self {
            name: "",
            priority: 0,
            state: ThreadState::Free,
            generation: 0,
            entry: None,
            handle: None,
            os_thread: None,
            tid: None,
        }
    }

    /// Return the block to FREE, invalidating any thread still bound to it.
    ///
    /// Hands back the entry and join handle so the caller can drop/join
    /// them after releasing the scheduler lock.
    pub fn release(&mut self) -> (Option<ThreadEntry>, Option<JoinHandle<()>>) {
        self.generation = self.generation.wrapping_add(1);
        self.state = ThreadState::Free;
        self.os_thread = None;
        self.tid = None;
        (self.entry.take(), self.handle.take())
    }
}
