//! Close codes a gateway may end a socket with
//!
//! Codes 4000-4009 are gateway-specific. The client needs two facts about each: whether
//! opening a new socket can help, and a readable reason for logs and events.

use std::fmt;

/// What the transport does after the server closed the socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// Back off and open a new socket
    Reconnect,
    /// The credential was refused; stay down until a new one is supplied
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    UnknownError = 4000,
    UnknownOpcode = 4001,
    DecodeError = 4002,
    NotAuthenticated = 4003,
    AuthenticationFailed = 4004,
    /// Another connection took over this session
    SessionReplaced = 4005,
    UnknownEvent = 4006,
    /// Ack id reused while still pending
    InvalidAckId = 4007,
    RateLimited = 4008,
    SessionTimeout = 4009,
}

const KNOWN: [CloseCode; 10] = [
    CloseCode::UnknownError,
    CloseCode::UnknownOpcode,
    CloseCode::DecodeError,
    CloseCode::NotAuthenticated,
    CloseCode::AuthenticationFailed,
    CloseCode::SessionReplaced,
    CloseCode::UnknownEvent,
    CloseCode::InvalidAckId,
    CloseCode::RateLimited,
    CloseCode::SessionTimeout,
];

impl CloseCode {
    /// `None` for standard WebSocket codes and unassigned gateway codes
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        KNOWN.into_iter().find(|code| code.as_u16() == value)
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Only a refused credential stops reconnection; the same credential would be
    /// refused again.
    #[must_use]
    pub const fn action(self) -> CloseAction {
        match self {
            Self::NotAuthenticated | Self::AuthenticationFailed => CloseAction::Stop,
            _ => CloseAction::Reconnect,
        }
    }

    #[must_use]
    pub const fn is_auth_failure(self) -> bool {
        matches!(self.action(), CloseAction::Stop)
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "gateway error",
            Self::UnknownOpcode => "gateway did not understand an op code",
            Self::DecodeError => "gateway could not decode a frame",
            Self::NotAuthenticated => "no credential presented",
            Self::AuthenticationFailed => "credential refused",
            Self::SessionReplaced => "session replaced by another connection",
            Self::UnknownEvent => "gateway did not recognise an event",
            Self::InvalidAckId => "ack id reused while pending",
            Self::RateLimited => "rate limited",
            Self::SessionTimeout => "session timed out",
        }
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.description())
    }
}
