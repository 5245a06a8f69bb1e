//! Per-worker activity tracking.
//!
//! Each worker registers the name of the actor it is about to run and
//! clears it when the turn ends, on every exit path, via the guard's
//! `Drop`. A [`DebugTracker::snapshot`] of a wedged pool tells you
//! immediately which actors the workers are stuck in.

use parking_lot::RwLock;
use std::time::Instant;

struct Activity {
    name: String,
    since: Instant,
}

/// Tracks what every worker is doing right now.
pub struct DebugTracker {
    slots: Box<[RwLock<Option<Activity>>]>,
}

impl DebugTracker {
    pub fn new(workers: usize) -> Self {
        Self {
            slots: (0..workers).map(|_| RwLock::new(None)).collect(),
        }
    }

    /// Record that `worker` is running the actor called `name`. The
    /// returned guard clears the record when dropped.
    pub fn start(&self, worker: usize, name: &str) -> ActivityGuard<'_> {
        let slot = &self.slots[worker];
        *slot.write() = Some(Activity {
            name: name.to_string(),
            since: Instant::now(),
        });
        ActivityGuard { slot }
    }

    /// Current actor name per worker; `None` for idle workers.
    pub fn snapshot(&self) -> Vec<Option<String>> {
        self.slots
            .iter()
            .map(|slot| slot.read().as_ref().map(|a| a.name.clone()))
            .collect()
    }

    /// Longest-running current activity, if any worker is busy. Useful
    /// for spotting a turn that never yields.
    pub fn longest_running(&self) -> Option<(String, std::time::Duration)> {
        self.slots
            .iter()
            .filter_map(|slot| {
                slot.read()
                    .as_ref()
                    .map(|a| (a.name.clone(), a.since.elapsed()))
            })
            .max_by_key(|(_, elapsed)| *elapsed)
    }
}

impl std::fmt::Debug for DebugTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugTracker")
            .field("activity", &self.snapshot())
            .finish()
    }
}

/// Clears the worker's activity record on drop.
pub struct ActivityGuard<'a> {
    slot: &'a RwLock<Option<Activity>>,
}

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        *self.slot.write() = None;
    }
}

impl std::fmt::Debug for ActivityGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ActivityGuard")
    }
}
