//! # kindred-realtime
//!
//! Client-side realtime connection manager for the Kindred dating app.
//!
//! - [`connection::RealtimeClient`] keeps one authenticated connection and replays
//!   rooms, status subscriptions and queued emits after every reconnect
//! - [`broadcast::EventDispatcher`] fans inbound events out to handlers
//! - [`notify::NotificationGate`] turns messages, likes and matches into local
//!   notifications for a registered device
//! - [`session::RealtimeSession`] wires the pieces together from a
//!   [`ClientConfig`](kindred_common::ClientConfig)

pub mod api;
pub mod broadcast;
pub mod connection;
pub mod notify;
pub mod protocol;
pub mod queue;
pub mod session;
pub mod transport;

pub use broadcast::{EventDispatcher, Subscription};
pub use connection::{
    Acknowledgement, ClientOptions, ConnectionState, ConnectionStatus, EmitOutcome,
    HealthStatus, RealtimeClient,
};
pub use session::{RealtimeSession, SessionBuilder};
pub use transport::{Transport, TransportError, TransportSignal, WsTransport};
