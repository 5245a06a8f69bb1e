//! Actor handles and mailboxes.
//!
//! The scheduler moves [`ActorRef`]s around; it never looks inside a
//! mailbox itself. A cell carries a display name, an unbounded mailbox of
//! opaque closures, and the small scheduling state machine that keeps each
//! cell in flight at most once:
//!
//! ```text
//!   Idle --send--> Queued --worker pop--> Running --backlog--> Queued
//!                                            \--drained--> Idle
//! ```
//!
//! A sender that wins the `Idle -> Queued` race submits the handle; every
//! other sender just leaves its message in the mailbox. The executor owns
//! the `Running ->` transitions after a turn.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Opaque unit of actor work. Payload semantics belong to the caller.
pub type Message = Box<dyn FnOnce() + Send + 'static>;

/// Shared handle to an actor. Pushing a handle into a scheduler queue
/// moves the `Arc` in; popping moves it out, so queue residency holds
/// exactly one reference.
pub type ActorRef = Arc<ActorCell>;

const IDLE: u8 = 0;
const QUEUED: u8 = 1;
const RUNNING: u8 = 2;

/// What a worker pulls out of a queue: either one actor turn to run, or
/// the order to exit. Exactly one `Stop` is injected per worker at
/// shutdown, and a worker consumes at most one because it returns
/// immediately on receipt.
pub(crate) enum Unit {
    Actor(ActorRef),
    Stop,
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Actor(actor) => f.debug_tuple("Actor").field(&actor.name()).finish(),
            Unit::Stop => f.write_str("Stop"),
        }
    }
}

/// Unbounded multi-producer mailbox drained by whichever worker runs the
/// actor's turn.
pub struct Mailbox {
    tx: Sender<Message>,
    rx: Receiver<Message>,
}

impl Mailbox {
    fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn push(&self, msg: Message) {
        // Receiver lives in the same struct, so the channel can't be
        // disconnected while the mailbox is alive.
        let _ = self.tx.send(msg);
    }

    pub fn try_pop(&self) -> Option<Message> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox").field("len", &self.len()).finish()
    }
}

/// One actor as the scheduler sees it: a name for diagnostics, a mailbox,
/// and the in-flight state word.
pub struct ActorCell {
    name: String,
    mailbox: Mailbox,
    state: AtomicU8,
}

impl ActorCell {
    pub fn new<S: Into<String>>(name: S) -> ActorRef {
        Arc::new(Self {
            name: name.into(),
            mailbox: Mailbox::new(),
            state: AtomicU8::new(IDLE),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Sender side: claim the right to submit this cell. Exactly one
    /// concurrent caller wins per quiescent period.
    pub fn try_enqueue(&self) -> bool {
        self.state
            .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Executor side: take the cell for one turn. Fails if the cell was
    /// not in the queued state (it is then someone else's problem).
    pub fn begin_turn(&self) -> bool {
        self.state
            .compare_exchange(QUEUED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Executor side, backlog left after the turn: put the cell back in
    /// the queued state so it can be resubmitted.
    pub fn requeue_after_turn(&self) -> bool {
        self.state
            .compare_exchange(RUNNING, QUEUED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Executor side, mailbox drained: retire the cell. The caller must
    /// re-check the mailbox afterwards -- a sender may have pushed while
    /// the cell was still running, lost its `try_enqueue`, and be counting
    /// on this re-check.
    pub fn finish_turn(&self) -> bool {
        self.state
            .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl fmt::Debug for ActorCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorCell")
            .field("name", &self.name)
            .field("pending", &self.mailbox.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_mailbox_fifo() {
        let cell = ActorCell::new("mbox");
        let hits = Arc::new(AtomicUsize::new(0));

        for i in 0..3 {
            let hits = hits.clone();
            cell.mailbox().push(Box::new(move || {
                hits.fetch_add(i, Ordering::Relaxed);
            }));
        }
        assert_eq!(cell.mailbox().len(), 3);

        while let Some(msg) = cell.mailbox().try_pop() {
            msg();
        }
        assert_eq!(hits.load(Ordering::Relaxed), 3);
        assert!(cell.mailbox().is_empty());
    }

    #[test]
    fn test_enqueue_race_has_single_winner() {
        let cell = ActorCell::new("racer");

        assert!(cell.try_enqueue());
        assert!(!cell.try_enqueue());
        assert!(cell.begin_turn());
        assert!(!cell.begin_turn());
    }

    #[test]
    fn test_turn_lifecycle() {
        let cell = ActorCell::new("cycle");

        assert!(cell.try_enqueue());
        assert!(cell.begin_turn());
        assert!(cell.finish_turn());

        // Retired cell can be enqueued again.
        assert!(cell.try_enqueue());
        assert!(cell.begin_turn());
        assert!(cell.requeue_after_turn());
        // Queued again without going through Idle.
        assert!(!cell.try_enqueue());
        assert!(cell.begin_turn());
    }
}
