//! Worker threads, the executor seam, and the pool.
//!
//! The worker loop polls its queues, parks on the waiter when everything
//! is dry, and hands each dequeued actor to the [`TurnExecutor`] for one
//! turn. The pool wires N workers to one global queue and one waiter and
//! owns the shutdown protocol.

pub mod panic_handler;
pub mod pool;
pub mod turn;
pub mod worker;

pub use panic_handler::{PanicHandler, PanicStrategy};
pub use pool::Pool;
pub use turn::{MailboxExecutor, TurnContext, TurnExecutor, TurnOptions};

pub(crate) use pool::Shared;
