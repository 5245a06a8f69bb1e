//! Panic isolation for actor turns.
//!
//! A panicking message handler must not take its worker thread down; the
//! turn is reported complete and the scheduler moves on.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

/// What to do when a message handler panics mid-turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanicStrategy {
    /// Abort the entire process
    Abort,
    /// Swallow the panic; the caller inspects the returned payload
    Isolate,
    /// Log the payload and continue
    LogAndContinue,
}

impl Default for PanicStrategy {
    fn default() -> Self {
        PanicStrategy::LogAndContinue
    }
}

/// Catches panics escaping message dispatch.
pub struct PanicHandler {
    strategy: PanicStrategy,
    panic_count: AtomicUsize,
}

impl PanicHandler {
    pub fn new(strategy: PanicStrategy) -> Self {
        Self {
            strategy,
            panic_count: AtomicUsize::new(0),
        }
    }

    /// Run `f`, trapping any panic. `who` names the actor for the log
    /// line.
    pub fn dispatch<F>(&self, who: &str, f: F) -> Result<(), String>
    where
        F: FnOnce(),
    {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(()) => Ok(()),
            Err(payload) => {
                self.panic_count.fetch_add(1, Ordering::Relaxed);
                let message = payload_message(payload);

                match self.strategy {
                    PanicStrategy::Abort => {
                        log::error!("actor {who} panicked, aborting: {message}");
                        std::process::abort();
                    }
                    PanicStrategy::Isolate => {}
                    PanicStrategy::LogAndContinue => {
                        log::warn!("actor {who} panicked: {message}");
                    }
                }

                Err(message)
            }
        }
    }

    pub fn panic_count(&self) -> usize {
        self.panic_count.load(Ordering::Relaxed)
    }

    pub fn strategy(&self) -> PanicStrategy {
        self.strategy
    }
}

impl Default for PanicHandler {
    fn default() -> Self {
        Self::new(PanicStrategy::default())
    }
}

impl std::fmt::Debug for PanicHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanicHandler")
            .field("strategy", &self.strategy)
            .field("panic_count", &self.panic_count())
            .finish()
    }
}

fn payload_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
