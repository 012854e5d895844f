//! Broadcaster orchestration module.

mod host;
mod orchestrator;
mod stats;

pub use host::HostIdentity;
pub use orchestrator::{Broadcaster, BroadcasterConfig};
pub use stats::{BroadcastStats, StopReason};
