//! Gateway frame format

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::OpCode;

/// Default heartbeat interval announced by Hello, in milliseconds
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 25_000;

/// Every WebSocket text frame follows this format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Operation code
    pub op: OpCode,

    /// Event name (op=0 only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Ack correlation id; set on an event that expects a reply and echoed by the reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    /// Payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

/// Payload of the Hello frame (op=10)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    pub session_id: String,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: u64,
}

fn default_heartbeat_interval() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_MS
}

impl Frame {
    /// Create a fire-and-forget event (op=0)
    #[must_use]
    pub fn event(name: impl Into<String>, data: Value) -> Self {
        Self {
            op: OpCode::Event,
            t: Some(name.into()),
            id: None,
            d: Some(data),
        }
    }

    /// Create an event that expects an Ack with the same id (op=0)
    #[must_use]
    pub fn request(name: impl Into<String>, id: u64, data: Value) -> Self {
        Self {
            id: Some(id),
            ..Self::event(name, data)
        }
    }

    /// Create an Ack reply (op=3)
    #[must_use]
    pub fn ack(id: u64, data: Value) -> Self {
        Self {
            op: OpCode::Ack,
            t: None,
            id: Some(id),
            d: Some(data),
        }
    }

    /// Create a Hello frame (op=10)
    #[must_use]
    pub fn hello(session_id: impl Into<String>, heartbeat_interval: u64) -> Self {
        let payload = HelloPayload {
            session_id: session_id.into(),
            heartbeat_interval,
        };
        Self {
            op: OpCode::Hello,
            t: None,
            id: None,
            d: serde_json::to_value(payload).ok(),
        }
    }

    /// Create a Heartbeat frame (op=1)
    #[must_use]
    pub fn heartbeat() -> Self {
        Self {
            op: OpCode::Heartbeat,
            t: None,
            id: None,
            d: None,
        }
    }

    /// Create a Heartbeat ACK frame (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self {
            op: OpCode::HeartbeatAck,
            t: None,
            id: None,
            d: None,
        }
    }

    /// Try to parse the Hello payload
    pub fn as_hello(&self) -> Option<HelloPayload> {
        if self.op != OpCode::Hello {
            return None;
        }
        self.d
            .as_ref()
            .and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
