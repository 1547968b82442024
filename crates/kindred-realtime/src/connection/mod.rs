//! Connection manager
//!
//! [`RealtimeClient`] keeps exactly one authenticated connection, replays rooms,
//! status subscriptions and queued emits after every reconnect, and routes inbound
//! events to the [`EventDispatcher`](crate::broadcast::EventDispatcher).

mod ack;
mod client;
mod messaging;
mod options;
mod presence;
mod rooms;
mod state;
mod typing;

pub use ack::{Acknowledgement, EmitOutcome};
pub use client::RealtimeClient;
pub use options::ClientOptions;
pub use state::{ConnectionState, ConnectionStatus, HealthStatus};

#[cfg(test)]
pub(crate) use client::test_support;
