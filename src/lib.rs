//! Spindle -- a work-stealing actor scheduler.
//!
//! Multiplexes many thousands of lightweight actors onto a small pool of
//! CPU worker threads. Each worker owns a FIFO deque; overflow and
//! cross-thread submissions go through a shared global queue; idle
//! workers steal batches from their peers; and a per-pool waiter lets
//! workers sleep without ever losing a wakeup.
//!
//! # Quick Start
//!
//! ```no_run
//! use spindle::prelude::*;
//!
//! let mut pool = Pool::start(Config::default()).unwrap();
//!
//! let actor = ActorCell::new("greeter");
//! pool.send(&actor, Box::new(|| println!("hello from a worker")));
//!
//! pool.stop();
//! ```
//!
//! # How work moves
//!
//! A turn is one invocation of the executor on one actor. Producers push
//! actor handles; a handle in a queue means exactly one turn is owed.
//! Workers poll their own queue first (cache affinity), flip to
//! global-first once every [`Config::global_poll_stride`] attempts so
//! external submissions cannot starve, and steal from peers as a last
//! resort. Shutdown is in-band: one stop unit per worker.

#![warn(missing_debug_implementations)]
#![allow(dead_code)]

pub mod actor;
pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod telemetry;
pub mod util;

mod queue;

pub use actor::{ActorCell, ActorRef, Mailbox, Message};
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use executor::{
    MailboxExecutor, PanicHandler, PanicStrategy, Pool, TurnContext, TurnExecutor, TurnOptions,
};
pub use telemetry::{DebugTracker, Metrics, MetricsSnapshot};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_pool_runs_messages_end_to_end() {
        let config = Config::builder().workers(2).build().unwrap();
        let mut pool = Pool::start(config).unwrap();

        let counter = Arc::new(AtomicUsize::new(0));
        let actors: Vec<_> = (0..8).map(|i| ActorCell::new(format!("a{i}"))).collect();

        for actor in &actors {
            for _ in 0..10 {
                let counter = counter.clone();
                pool.send(
                    actor,
                    Box::new(move || {
                        counter.fetch_add(1, Ordering::Relaxed);
                    }),
                );
            }
        }

        for _ in 0..400 {
            if counter.load(Ordering::Relaxed) == 80 {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(counter.load(Ordering::Relaxed), 80);

        pool.stop();
        let metrics = pool.metrics();
        assert!(metrics.turns >= 8);
    }
}
