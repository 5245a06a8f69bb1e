//! The executor seam: what the scheduler calls to actually run an actor.
//!
//! The worker loop is deliberately ignorant of mailboxes and actor
//! semantics; everything it knows is "run one turn of this actor". The
//! [`TurnExecutor`] trait is that contract, [`TurnContext`] is what the
//! worker lends the executor for the duration of the turn, and
//! [`MailboxExecutor`] is the stock implementation that drains a budget
//! of mailbox messages and hands the cell back.

use crate::actor::{ActorRef, Unit};
use crate::executor::panic_handler::PanicHandler;
use crate::executor::Shared;
use crate::queue::LocalQueue;

/// Per-turn flags passed down from the worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnOptions {
    from_queue: bool,
}

impl TurnOptions {
    /// Marks the turn as driven by a scheduler queue pop (as opposed to a
    /// direct invocation by library code).
    pub fn with_from_queue(mut self) -> Self {
        self.from_queue = true;
        self
    }

    pub fn from_queue(&self) -> bool {
        self.from_queue
    }
}

/// What the worker lends an executor while it runs one turn: the worker's
/// identity and the submission paths back into the scheduler.
pub struct TurnContext<'a> {
    worker: usize,
    local: &'a LocalQueue,
    shared: &'a Shared,
    options: TurnOptions,
}

impl<'a> TurnContext<'a> {
    pub(crate) fn new(
        worker: usize,
        local: &'a LocalQueue,
        shared: &'a Shared,
        options: TurnOptions,
    ) -> Self {
        Self {
            worker,
            local,
            shared,
            options,
        }
    }

    /// Id of the worker thread running this turn.
    pub fn worker(&self) -> usize {
        self.worker
    }

    pub fn options(&self) -> TurnOptions {
        self.options
    }

    /// Mailbox messages an executor should drain per turn before handing
    /// the actor back.
    pub fn turn_budget(&self) -> usize {
        self.shared.turn_budget
    }

    /// Submit follow-up work onto the running worker's own queue. This is
    /// the affinity-preserving path; at the configured bound it spills to
    /// the global queue so the worker never hoards unboundedly.
    pub fn schedule_local(&self, actor: ActorRef) {
        if self.local.push(Unit::Actor(actor), &self.shared.global) {
            self.shared.metrics.record_spill();
        }
        self.shared.waiter.notify();
    }

    /// Submit work any worker may pick up.
    pub fn schedule_global(&self, actor: ActorRef) {
        self.shared.global.push(Unit::Actor(actor));
        self.shared.waiter.notify();
    }
}

impl std::fmt::Debug for TurnContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnContext")
            .field("worker", &self.worker)
            .field("options", &self.options)
            .finish()
    }
}

/// Runs one turn of an actor. Implementations own everything behind the
/// seam: draining the mailbox, yield rules, and where the handle goes
/// after the turn. Failures must be contained here -- as far as the
/// worker loop is concerned, every turn succeeds.
pub trait TurnExecutor: Send + Sync + 'static {
    fn run(&self, cx: &TurnContext<'_>, actor: ActorRef);
}

/// Stock executor: drain up to the turn budget from the mailbox with
/// per-message panic isolation, then either requeue the cell (backlog
/// remains) or retire it, re-checking the mailbox to close the race with
/// senders that arrived mid-turn.
pub struct MailboxExecutor {
    panics: PanicHandler,
}

impl MailboxExecutor {
    pub fn new(panics: PanicHandler) -> Self {
        Self { panics }
    }

    pub fn panic_count(&self) -> usize {
        self.panics.panic_count()
    }
}

impl Default for MailboxExecutor {
    fn default() -> Self {
        Self::new(PanicHandler::default())
    }
}

impl TurnExecutor for MailboxExecutor {
    fn run(&self, cx: &TurnContext<'_>, actor: ActorRef) {
        if !actor.begin_turn() {
            // Stale handle: the cell is not in the queued state. Nothing
            // to do; whoever moved it owns it now.
            log::debug!("skipping stale handle for {}", actor.name());
            return;
        }

        let mut drained = 0;
        while drained < cx.turn_budget() {
            let Some(msg) = actor.mailbox().try_pop() else {
                break;
            };
            if self.panics.dispatch(actor.name(), msg).is_err() {
                cx.shared.metrics.record_turn_panic();
            }
            drained += 1;
        }

        if !actor.mailbox().is_empty() {
            // Budget exhausted with backlog left: back of the line.
            if actor.requeue_after_turn() {
                cx.schedule_local(actor);
            }
        } else if actor.finish_turn() {
            // A sender may have pushed while we were running and lost its
            // enqueue race; it is counting on this re-check.
            if !actor.mailbox().is_empty() && actor.try_enqueue() {
                cx.schedule_local(actor);
            }
        }
    }
}

impl std::fmt::Debug for MailboxExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxExecutor")
            .field("panics", &self.panics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorCell;
    use crate::config::Config;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn test_shared() -> Shared {
        let config = Config::builder()
            .workers(1)
            .turn_budget(4)
            .build()
            .unwrap();
        Shared::new(&config, Arc::new(MailboxExecutor::default()))
    }

    fn context<'a>(local: &'a LocalQueue, shared: &'a Shared) -> TurnContext<'a> {
        TurnContext::new(0, local, shared, TurnOptions::default().with_from_queue())
    }

    #[test]
    fn test_turn_drains_up_to_budget() {
        let shared = test_shared();
        let local = LocalQueue::new(256);
        let executor = MailboxExecutor::default();
        let hits = Arc::new(AtomicUsize::new(0));

        let actor = ActorCell::new("drainer");
        for _ in 0..10 {
            let hits = hits.clone();
            actor.mailbox().push(Box::new(move || {
                hits.fetch_add(1, Ordering::Relaxed);
            }));
        }

        assert!(actor.try_enqueue());
        executor.run(&context(&local, &shared), actor.clone());

        // Budget is 4; the rest stays queued and the cell went back on
        // the local queue.
        assert_eq!(hits.load(Ordering::Relaxed), 4);
        assert_eq!(actor.mailbox().len(), 6);
        assert_eq!(local.len(), 1);
    }

    #[test]
    fn test_drained_actor_retires() {
        let shared = test_shared();
        let local = LocalQueue::new(256);
        let executor = MailboxExecutor::default();

        let actor = ActorCell::new("idler");
        actor.mailbox().push(Box::new(|| {}));

        assert!(actor.try_enqueue());
        executor.run(&context(&local, &shared), actor.clone());

        assert!(actor.mailbox().is_empty());
        assert!(local.is_empty());
        // Retired cell accepts a fresh enqueue.
        assert!(actor.try_enqueue());
    }

    #[test]
    fn test_stale_handle_is_skipped() {
        let shared = test_shared();
        let local = LocalQueue::new(256);
        let executor = MailboxExecutor::default();
        let hits = Arc::new(AtomicUsize::new(0));

        let actor = ActorCell::new("stale");
        let hits2 = hits.clone();
        actor.mailbox().push(Box::new(move || {
            hits2.fetch_add(1, Ordering::Relaxed);
        }));

        // Never enqueued: the cell is Idle, so the turn must not run.
        executor.run(&context(&local, &shared), actor.clone());
        assert_eq!(hits.load(Ordering::Relaxed), 0);
        assert_eq!(actor.mailbox().len(), 1);
    }

    #[test]
    fn test_panicking_message_does_not_kill_the_turn() {
        let shared = test_shared();
        let local = LocalQueue::new(256);
        let executor = MailboxExecutor::new(PanicHandler::new(
            crate::executor::PanicStrategy::Isolate,
        ));
        let hits = Arc::new(AtomicUsize::new(0));

        let actor = ActorCell::new("faulty");
        actor.mailbox().push(Box::new(|| panic!("bad message")));
        let hits2 = hits.clone();
        actor.mailbox().push(Box::new(move || {
            hits2.fetch_add(1, Ordering::Relaxed);
        }));

        assert!(actor.try_enqueue());
        executor.run(&context(&local, &shared), actor.clone());

        // The message after the panicking one still ran.
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert_eq!(executor.panic_count(), 1);
    }
}
