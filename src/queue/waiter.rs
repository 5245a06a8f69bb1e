use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{fence, AtomicUsize, Ordering};

use crate::util::{Backoff, CachePadded};

/// Slot states. Only the owning worker moves a slot out of `ACTIVE`;
/// `notify` (any thread) and `stop_wait` (the owner) move it back.
const ACTIVE: usize = 0;
const PRE_SLEEP: usize = 1;
const SLEEPING: usize = 2;

/// Park/unpark coordination between producers and idle workers.
///
/// Each worker owns one slot. Going to sleep is a two-phase affair: the
/// worker first publishes intent (`PreSleep`) and returns from [`wait`]
/// so the caller re-polls every queue, and only commits to a real sleep
/// on the next miss. A producer that pushes work and then calls
/// [`notify`] therefore either sees the published intent and releases the
/// worker, or the worker's re-poll sees the pushed unit. No interleaving
/// loses both.
///
/// The waiter is owned by its pool. Several pools in one process each get
/// their own.
///
/// [`wait`]: Waiter::wait
/// [`notify`]: Waiter::notify
pub(crate) struct Waiter {
    slots: Box<[ParkSlot]>,
    /// Number of slots not currently `ACTIVE`. Fast path: producers skip
    /// the slot scan entirely while every worker is busy.
    idle: AtomicUsize,
    /// Round-robin scan start so repeated notifies spread wakeups.
    next_wake: AtomicUsize,
    /// Failed polls a worker spends yielding before it arms its slot.
    yield_rounds: u32,
}

struct ParkSlot {
    state: CachePadded<AtomicUsize>,
    lock: Mutex<()>,
    condvar: Condvar,
}

/// Owner-side token for one worker's slot. Created once per worker thread
/// before the first `wait`.
pub(crate) struct Slot {
    worker: usize,
    rounds: u32,
    backoff: Backoff,
}

impl Waiter {
    pub fn new(workers: usize, yield_rounds: u32) -> Self {
        let slots = (0..workers)
            .map(|_| ParkSlot {
                state: CachePadded::new(AtomicUsize::new(ACTIVE)),
                lock: Mutex::new(()),
                condvar: Condvar::new(),
            })
            .collect();

        Self {
            slots,
            idle: AtomicUsize::new(0),
            next_wake: AtomicUsize::new(0),
            yield_rounds,
        }
    }

    /// One-time slot initialisation for the owning worker.
    pub fn slot(&self, worker: usize) -> Slot {
        debug_assert!(worker < self.slots.len());
        Slot {
            worker,
            rounds: 0,
            backoff: Backoff::new(),
        }
    }

    /// Owner-only. Returns when new work may be available; spurious
    /// returns are expected and the caller must re-poll its sources after
    /// every return. The first few calls merely yield; the next publishes
    /// sleep intent and returns so the caller re-checks; only a further
    /// miss actually sleeps until [`Waiter::notify`].
    pub fn wait(&self, slot: &mut Slot) {
        if slot.rounds < self.yield_rounds {
            slot.rounds += 1;
            slot.backoff.snooze();
            return;
        }

        let park = &self.slots[slot.worker];

        if park
            .state
            .compare_exchange(ACTIVE, PRE_SLEEP, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.idle.fetch_add(1, Ordering::SeqCst);
            // Pairs with the fence in notify(): either a producer's
            // notify sees this slot idle, or our caller's re-poll sees
            // the producer's push.
            fence(Ordering::SeqCst);
            return;
        }

        // Intent already published and the re-poll still missed: sleep.
        let mut guard = park.lock.lock();
        if park
            .state
            .compare_exchange(PRE_SLEEP, SLEEPING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            while park.state.load(Ordering::SeqCst) == SLEEPING {
                park.condvar.wait(&mut guard);
            }
        }
        // Slot is ACTIVE again, released by notify() or a racing
        // stop_wait before we got here.
        drop(guard);
        slot.rounds = 0;
        slot.backoff.reset();
    }

    /// Owner-only. Cancels any armed sleep after the owner found work on
    /// its own. Idempotent.
    pub fn stop_wait(&self, slot: &mut Slot) {
        slot.rounds = 0;
        slot.backoff.reset();
        let park = &self.slots[slot.worker];
        if park
            .state
            .compare_exchange(PRE_SLEEP, ACTIVE, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.idle.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Any thread. Releases at least one idle worker if there is one;
    /// no-op while every slot is active. Call after making work
    /// available.
    pub fn notify(&self) {
        fence(Ordering::SeqCst);
        if self.idle.load(Ordering::SeqCst) == 0 {
            return;
        }

        let n = self.slots.len();
        let start = self.next_wake.fetch_add(1, Ordering::Relaxed) % n;

        for i in 0..n {
            let park = &self.slots[(start + i) % n];
            loop {
                match park.state.load(Ordering::SeqCst) {
                    PRE_SLEEP => {
                        if park
                            .state
                            .compare_exchange(
                                PRE_SLEEP,
                                ACTIVE,
                                Ordering::SeqCst,
                                Ordering::SeqCst,
                            )
                            .is_ok()
                        {
                            self.idle.fetch_sub(1, Ordering::SeqCst);
                            return;
                        }
                        // Lost a race with the owner or another notifier;
                        // re-examine the slot.
                    }
                    SLEEPING => {
                        // The owner holds the slot lock from arming the
                        // sleep until the condvar wait releases it, so
                        // taking it here closes the check-then-sleep
                        // window.
                        let _guard = park.lock.lock();
                        if park
                            .state
                            .compare_exchange(
                                SLEEPING,
                                ACTIVE,
                                Ordering::SeqCst,
                                Ordering::SeqCst,
                            )
                            .is_ok()
                        {
                            self.idle.fetch_sub(1, Ordering::SeqCst);
                            park.condvar.notify_one();
                            return;
                        }
                    }
                    _ => break,
                }
            }
        }
    }

    /// Number of slots currently armed or asleep.
    pub fn idle_count(&self) -> usize {
        self.idle.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_notify_without_sleepers_is_noop() {
        let waiter = Waiter::new(2, 0);
        waiter.notify();
        assert_eq!(waiter.idle_count(), 0);
    }

    #[test]
    fn test_wait_yield_phase_returns_spuriously() {
        let waiter = Waiter::new(1, 3);
        let mut slot = waiter.slot(0);

        // Yield rounds return without arming anything.
        for _ in 0..3 {
            waiter.wait(&mut slot);
            assert_eq!(waiter.idle_count(), 0);
        }

        // The next call publishes intent and still returns.
        waiter.wait(&mut slot);
        assert_eq!(waiter.idle_count(), 1);
    }

    #[test]
    fn test_stop_wait_disarms_and_is_idempotent() {
        let waiter = Waiter::new(1, 0);
        let mut slot = waiter.slot(0);

        waiter.wait(&mut slot);
        assert_eq!(waiter.idle_count(), 1);

        waiter.stop_wait(&mut slot);
        assert_eq!(waiter.idle_count(), 0);
        waiter.stop_wait(&mut slot);
        assert_eq!(waiter.idle_count(), 0);
    }

    #[test]
    fn test_notify_releases_armed_slot() {
        let waiter = Waiter::new(2, 0);
        let mut slot = waiter.slot(1);

        waiter.wait(&mut slot);
        assert_eq!(waiter.idle_count(), 1);

        waiter.notify();
        assert_eq!(waiter.idle_count(), 0);
    }

    #[test]
    fn test_notify_wakes_sleeping_worker() {
        let waiter = Arc::new(Waiter::new(1, 0));
        let ready = Arc::new(AtomicBool::new(false));

        let consumer = {
            let waiter = waiter.clone();
            let ready = ready.clone();
            thread::spawn(move || {
                let mut slot = waiter.slot(0);
                while !ready.load(Ordering::SeqCst) {
                    waiter.wait(&mut slot);
                }
                waiter.stop_wait(&mut slot);
            })
        };

        // Give the consumer time to fall asleep for real.
        thread::sleep(Duration::from_millis(50));

        ready.store(true, Ordering::SeqCst);
        waiter.notify();

        consumer.join().unwrap();
        assert_eq!(waiter.idle_count(), 0);
    }

    #[test]
    fn test_no_lost_wakeup_under_racing_producers() {
        use std::sync::atomic::AtomicUsize;

        let waiter = Arc::new(Waiter::new(1, 1));
        let produced = Arc::new(AtomicUsize::new(0));
        let consumed = Arc::new(AtomicUsize::new(0));
        const ROUNDS: usize = 2000;

        let consumer = {
            let waiter = waiter.clone();
            let produced = produced.clone();
            let consumed = consumed.clone();
            thread::spawn(move || {
                let mut slot = waiter.slot(0);
                loop {
                    let seen = produced.load(Ordering::SeqCst);
                    if consumed.load(Ordering::SeqCst) < seen {
                        waiter.stop_wait(&mut slot);
                        consumed.store(seen, Ordering::SeqCst);
                        if seen >= ROUNDS {
                            return;
                        }
                        continue;
                    }
                    waiter.wait(&mut slot);
                }
            })
        };

        for _ in 0..ROUNDS {
            produced.fetch_add(1, Ordering::SeqCst);
            waiter.notify();
        }

        consumer.join().unwrap();
        assert_eq!(consumed.load(Ordering::SeqCst), ROUNDS);
    }
}
