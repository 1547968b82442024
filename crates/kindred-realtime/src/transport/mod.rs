//! Transport layer
//!
//! A [`Transport`] owns the socket and its reconnection loop. The connection manager only
//! sees the stream of [`TransportSignal`]s returned by [`Transport::open`] and the
//! synchronous [`Transport::send`].

mod backoff;
#[cfg(test)]
pub(crate) mod mock;
mod websocket;

pub use backoff::ReconnectPolicy;
pub use websocket::WsTransport;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::protocol::Frame;

/// Something the transport observed, in the order it happened
#[derive(Debug, Clone, PartialEq)]
pub enum TransportSignal {
    /// Socket is up and authenticated
    Connected { session_id: Option<String> },
    /// Socket went away
    Disconnected { reason: String, will_reconnect: bool },
    /// A connection attempt failed; another attempt follows
    ConnectError { message: String },
    /// The server refused the credential; the transport stopped
    AuthRejected { reason: String },
    /// Named server event
    Event { name: String, data: Value },
    /// Reply to a request frame
    Ack { id: u64, data: Value },
}

/// Transport errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Transport is not connected")]
    NotConnected,

    #[error("Transport is closed")]
    Closed,

    #[error("Failed to encode frame: {0}")]
    Encode(String),
}

/// Bidirectional event transport with automatic reconnection
pub trait Transport: Send + Sync + 'static {
    /// Start connecting with `credential`, replacing any previous connection.
    ///
    /// The transport keeps reconnecting until [`Transport::close`] is called or the
    /// server rejects the credential.
    fn open(&self, credential: String) -> mpsc::UnboundedReceiver<TransportSignal>;

    /// Hand a frame to the socket
    fn send(&self, frame: Frame) -> Result<(), TransportError>;

    /// Whether a socket is currently up
    fn is_connected(&self) -> bool;

    /// Stop reconnecting and close the socket
    fn close(&self);
}
