use crossbeam_deque::Stealer;
use std::sync::Arc;
use std::time::Instant;

use crate::actor::Unit;
use crate::executor::turn::{TurnContext, TurnOptions};
use crate::executor::Shared;
use crate::queue::{LocalQueue, Slot};

/// One worker thread: an id, the owned local queue, stealer handles to
/// every peer, and the shared pool state.
pub(crate) struct Worker {
    pub id: usize,
    pub local: LocalQueue,
    /// Indexed by worker id; entry `id` is this worker's own stealer and
    /// is never used.
    pub stealers: Vec<Stealer<Unit>>,
    pub shared: Arc<Shared>,
    /// Poll attempts since the last forced global-first check.
    cnt: u32,
}

impl Worker {
    pub fn new(id: usize, local: LocalQueue, stealers: Vec<Stealer<Unit>>, shared: Arc<Shared>) -> Self {
        Self {
            id,
            local,
            stealers,
            shared,
            cnt: 0,
        }
    }

    /// Main loop. Runs until a stop unit is popped.
    pub fn run(mut self) {
        let mut slot: Slot = self.shared.waiter.slot(self.id);
        log::debug!("worker {} started", self.id);

        loop {
            match self.try_pop() {
                Some(unit) => {
                    // The slot may be half-armed from earlier misses.
                    self.shared.waiter.stop_wait(&mut slot);

                    match unit {
                        Unit::Stop => {
                            log::debug!("worker {} stopping", self.id);
                            return;
                        }
                        Unit::Actor(actor) => {
                            let _activity = self.shared.debug.start(self.id, actor.name());
                            log::debug!(
                                "worker {} runs {} ({} pending)",
                                self.id,
                                actor.name(),
                                actor.mailbox().len()
                            );

                            let started = Instant::now();
                            let cx = TurnContext::new(
                                self.id,
                                &self.local,
                                &self.shared,
                                TurnOptions::default().with_from_queue(),
                            );
                            self.shared.executor.run(&cx, actor);

                            self.shared
                                .metrics
                                .record_turn(self.id, started.elapsed().as_nanos() as u64);
                        }
                    }
                }
                None => {
                    self.shared.metrics.record_wait();
                    self.shared.waiter.wait(&mut slot);
                }
            }
        }
    }

    /// One poll attempt across all sources.
    ///
    /// Local first for cache affinity; every `global_poll_stride`-th
    /// attempt flips to global-first so cross-thread submissions cannot
    /// be starved by a local queue that keeps feeding itself. When both
    /// miss, walk the peers starting just past our own id and try to
    /// steal; a full dry lap is a miss.
    pub fn try_pop(&mut self) -> Option<Unit> {
        self.cnt += 1;
        if self.cnt == self.shared.global_poll_stride {
            self.cnt = 0;
            if let Some(unit) = self.try_pop_global().or_else(|| self.try_pop_local()) {
                return Some(unit);
            }
        } else if let Some(unit) = self.try_pop_local().or_else(|| self.try_pop_global()) {
            return Some(unit);
        }

        let workers = self.stealers.len();
        for i in 1..workers {
            let pos = (self.id + i) % workers;
            if let Some(unit) = self.local.steal_from(&self.stealers[pos]) {
                self.shared.metrics.record_steal(self.id);
                log::debug!("worker {} stole from worker {}", self.id, pos);
                return Some(unit);
            }
        }

        None
    }

    fn try_pop_local(&self) -> Option<Unit> {
        self.local.pop()
    }

    fn try_pop_global(&self) -> Option<Unit> {
        self.shared.global.try_pop()
    }
}
