//! Observability for the scheduler.
//!
//! [`Metrics`] counts what the workers do (turns, steals, spills, waits)
//! and keeps a turn-latency histogram; [`DebugTracker`] records which
//! actor each worker is running right now, which is the first thing you
//! want when a pool looks wedged.

pub mod debug;
pub mod metrics;

pub use debug::{ActivityGuard, DebugTracker};
pub use metrics::{Metrics, MetricsSnapshot};
