use crossbeam_deque::{Injector, Steal};

use crate::actor::Unit;

/// Shared FIFO for overflow and cross-thread submission. Any thread may
/// push; any worker may pop. Unbounded, so a push can never fail and
/// producers never block.
pub(crate) struct GlobalQueue {
    injector: Injector<Unit>,
}

impl GlobalQueue {
    pub fn new() -> Self {
        Self {
            injector: Injector::new(),
        }
    }

    pub fn push(&self, unit: Unit) {
        self.injector.push(unit);
    }

    /// Pop a single unit. Retries internal contention losses, so a miss
    /// really means the queue was observed empty.
    pub fn try_pop(&self) -> Option<Unit> {
        loop {
            match self.injector.steal() {
                Steal::Success(unit) => return Some(unit),
                Steal::Empty => return None,
                Steal::Retry => continue,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.injector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.injector.is_empty()
    }
}
