use crossbeam_deque::{Steal, Stealer, Worker as Deque};

use crate::actor::Unit;
use crate::queue::global::GlobalQueue;

/// Per-worker FIFO deque. The owning worker pushes and pops; every other
/// worker holds a [`Stealer`] handle and may move a batch of units over to
/// its own queue.
///
/// The deque itself is unbounded; the configured `limit` caps how much a
/// worker is allowed to hoard. An owner push that finds the queue at the
/// limit is redirected to the global queue, where any worker can pick it
/// up. The owner never blocks.
pub(crate) struct LocalQueue {
    deque: Deque<Unit>,
    limit: usize,
}

impl LocalQueue {
    pub fn new(limit: usize) -> Self {
        Self {
            deque: Deque::new_fifo(),
            limit,
        }
    }

    pub fn stealer(&self) -> Stealer<Unit> {
        self.deque.stealer()
    }

    /// Owner-only push. Returns true if the unit spilled to the global
    /// queue instead.
    pub fn push(&self, unit: Unit, overflow: &GlobalQueue) -> bool {
        if self.deque.len() >= self.limit {
            overflow.push(unit);
            true
        } else {
            self.deque.push(unit);
            false
        }
    }

    /// Owner-only pop.
    pub fn pop(&self) -> Option<Unit> {
        self.deque.pop()
    }

    /// Steal a batch of units from `victim` into this queue and return one
    /// of them to run right away; the rest amortise future pops. A miss
    /// means the victim was observed empty.
    pub fn steal_from(&self, victim: &Stealer<Unit>) -> Option<Unit> {
        loop {
            match victim.steal_batch_and_pop(&self.deque) {
                Steal::Success(unit) => return Some(unit),
                Steal::Empty => return None,
                Steal::Retry => continue,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.deque.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }
}
