//! Convenience re-exports for the common case.

pub use crate::actor::{ActorCell, ActorRef, Message};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::executor::{Pool, TurnContext, TurnExecutor};
pub use crate::telemetry::MetricsSnapshot;
