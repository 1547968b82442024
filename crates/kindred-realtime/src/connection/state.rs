//! Connection state and the status snapshot

use kindred_core::{ConversationId, UserId};
use serde::Serialize;
use std::fmt;

/// Lifecycle of the realtime connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse health grade derived from the backlog and reconnect churn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Poor,
    Disconnected,
}

impl HealthStatus {
    #[must_use]
    pub fn grade(connected: bool, pending_events: usize, reconnect_attempts: u32) -> Self {
        if !connected {
            Self::Disconnected
        } else if pending_events > 10 || reconnect_attempts > 5 {
            Self::Poor
        } else if pending_events > 5 || reconnect_attempts > 2 {
            Self::Degraded
        } else {
            Self::Healthy
        }
    }
}

/// Point-in-time view of the connection manager
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub session_id: Option<String>,
    pub reconnect_attempts: u32,
    pub pending_events: usize,
    pub joined_rooms: Vec<ConversationId>,
    pub subscriptions: Vec<UserId>,
    pub cached_presence: usize,
    pub typing_sessions: usize,
    pub health: HealthStatus,
}

impl ConnectionStatus {
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}
