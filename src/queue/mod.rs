//! Scheduler queues and the parking protocol.
//!
//! Three pieces cooperate to move work units between workers:
//!
//! - [`LocalQueue`]: one per worker, FIFO, owner push/pop with peer steal;
//!   pushes past the configured bound spill into the global queue.
//! - [`GlobalQueue`]: shared MPMC FIFO for overflow and cross-thread
//!   submission.
//! - [`Waiter`]: lets an idle worker sleep until a producer announces new
//!   work, without ever losing a wakeup.

pub(crate) mod global;
pub(crate) mod local;
pub(crate) mod waiter;

pub(crate) use global::GlobalQueue;
pub(crate) use local::LocalQueue;
pub(crate) use waiter::{Slot, Waiter};
