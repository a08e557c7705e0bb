//! Priority run queue
//!
//! One FIFO per priority level plus a bit cache of the non-empty levels.
//! Level 0 is the highest priority. The running thread stays at the head
//! of its level; yielding moves it to the tail.

use crate::thread::ThreadId;
use std::collections::VecDeque;
use yieldbench_common::{config, Priority};

pub(crate) struct RunQueue {
    /// Bit `p` is set while level `p` holds at least one thread
    bitcache: u32,
    queues: Vec<VecDeque<ThreadId>>,
}

impl RunQueue {
    pub fn new(num_priorities: u8) -> Self {
        debug_assert!(num_priorities <= config::MAX_PRIORITIES);
        Self {
            bitcache: 0,
            queues: (0..num_priorities).map(|_| VecDeque::new()).collect(),
        }
    }

    /// Appends thread `n` to level `rq`
    pub fn add(&mut self, n: ThreadId, rq: Priority) {
        debug_assert!((rq as usize) < self.queues.len());
        self.queues[rq as usize].push_back(n);
        self.bitcache |= 1 << rq;
    }

    /// Inserts thread `n` at the head of level `rq`
    pub fn add_head(&mut self, n: ThreadId, rq: Priority) {
        debug_assert!((rq as usize) < self.queues.len());
        self.queues[rq as usize].push_front(n);
        self.bitcache |= 1 << rq;
    }

    /// Removes thread `n` from level `rq`. Returns `false` if it was not queued.
    pub fn remove(&mut self, n: ThreadId, rq: Priority) -> bool {
        let queue = &mut self.queues[rq as usize];
        let Some(pos) = queue.iter().position(|&t| t == n) else {
            return false;
        };
        queue.remove(pos);
        if queue.is_empty() {
            self.bitcache &= !(1 << rq);
        }
        true
    }

    /// Moves thread `n` to the tail of level `rq`.
    ///
    /// This is the yield operation among threads of the same priority.
    pub fn advance_from(&mut self, n: ThreadId, rq: Priority) {
        let queue = &mut self.queues[rq as usize];
        if queue.front() == Some(&n) {
            queue.rotate_left(1);
        } else if let Some(pos) = queue.iter().position(|&t| t == n) {
            queue.remove(pos);
            queue.push_back(n);
        }
    }

    /// Thread that should hold the CPU
    pub fn next(&self) -> Option<ThreadId> {
        if self.bitcache == 0 {
            return None;
        }
        let rq = self.bitcache.trailing_zeros() as usize;
        self.queues[rq].front().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(n: usize) -> ThreadId {
        ThreadId(n)
    }

    #[test]
    fn test_rq_basic() {
        let mut runqueue = RunQueue::new(8);

        runqueue.add(t(0), 0);
        runqueue.add(t(1), 0);
        runqueue.add(t(2), 0);

        assert_eq!(runqueue.next(), Some(t(0)));

        runqueue.advance_from(t(0), 0);
        assert_eq!(runqueue.next(), Some(t(1)));

        runqueue.advance_from(t(1), 0);
        assert_eq!(runqueue.next(), Some(t(2)));
        assert_eq!(runqueue.next(), Some(t(2)));

        runqueue.advance_from(t(2), 0);
        assert_eq!(runqueue.next(), Some(t(0)));
    }

    #[test]
    fn test_rq_basic_twoprio() {
        let mut runqueue = RunQueue::new(8);

        runqueue.add(t(0), 1);
        runqueue.add(t(1), 1);
        runqueue.add(t(3), 1);

        runqueue.add(t(2), 0);
        runqueue.add(t(4), 0);

        assert_eq!(runqueue.next(), Some(t(2)));
        assert!(runqueue.remove(t(2), 0));
        assert_eq!(runqueue.next(), Some(t(4)));
        assert!(runqueue.remove(t(4), 0));
        assert_eq!(runqueue.next(), Some(t(0)));
        assert!(runqueue.remove(t(0), 1));
        assert_eq!(runqueue.next(), Some(t(1)));
        assert!(runqueue.remove(t(1), 1));
        assert_eq!(runqueue.next(), Some(t(3)));
        assert!(runqueue.remove(t(3), 1));
        assert_eq!(runqueue.next(), None);
    }

    #[test]
    fn test_push_twice() {
        let mut runqueue = RunQueue::new(8);

        runqueue.add(t(0), 0);
        runqueue.add(t(1), 0);

        assert_eq!(runqueue.next(), Some(t(0)));
        runqueue.remove(t(0), 0);
        assert_eq!(runqueue.next(), Some(t(1)));

        runqueue.add(t(0), 0);
        assert_eq!(runqueue.next(), Some(t(1)));

        runqueue.advance_from(t(1), 0);
        assert_eq!(runqueue.next(), Some(t(0)));
    }

    #[test]
    fn test_single_thread_advance_keeps_head() {
        let mut runqueue = RunQueue::new(16);

        runqueue.add(t(0), 13);
        runqueue.add(t(1), 14);

        runqueue.advance_from(t(0), 13);
        assert_eq!(runqueue.next(), Some(t(0)));
    }

    #[test]
    fn test_advance_from_non_head() {
        let mut runqueue = RunQueue::new(4);

        runqueue.add(t(0), 2);
        runqueue.add(t(1), 2);
        runqueue.add(t(2), 2);

        runqueue.advance_from(t(1), 2);
        assert_eq!(runqueue.next(), Some(t(0)));
        runqueue.remove(t(0), 2);
        assert_eq!(runqueue.next(), Some(t(2)));
        runqueue.remove(t(2), 2);
        assert_eq!(runqueue.next(), Some(t(1)));
    }

    #[test]
    fn test_add_head_and_missing_remove() {
        let mut runqueue = RunQueue::new(4);

        runqueue.add(t(1), 3);
        runqueue.add_head(t(0), 3);
        assert_eq!(runqueue.next(), Some(t(0)));

        assert!(!runqueue.remove(t(2), 3));
        assert!(!runqueue.remove(t(1), 0));
        assert_eq!(runqueue.next(), Some(t(0)));
    }

    #[test]
    fn test_all_levels() {
        let mut runqueue = RunQueue::new(config::MAX_PRIORITIES);

        for rq in (0..config::MAX_PRIORITIES).rev() {
            runqueue.add(t(rq as usize), rq);
            assert_eq!(runqueue.next(), Some(t(rq as usize)));
        }

        for rq in 0..config::MAX_PRIORITIES {
            assert_eq!(runqueue.next(), Some(t(rq as usize)));
            runqueue.remove(t(rq as usize), rq);
        }
        assert_eq!(runqueue.next(), None);
    }
}
