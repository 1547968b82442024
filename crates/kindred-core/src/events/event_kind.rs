//! Event kinds consumers can subscribe to

use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription key for the event dispatcher.
///
/// `Connect`, `Disconnect` and `ConnectError` are produced locally from transport
/// signals; every other kind maps to a server wire event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Connect,
    Disconnect,
    ConnectError,
    NewMessage,
    MessagesRead,
    MessageError,
    UserOnline,
    UserOffline,
    UserStatusChange,
    OnlineStatusResponse,
    TypingStart,
    TypingStop,
    NewLike,
    NewMatch,
    PrivacySettingsUpdated,
    UnreadCountUpdate,
    ConversationRead,
    /// Any wire event without a dedicated schema
    Other,
}

impl EventKind {
    /// Every kind, in declaration order
    pub const ALL: [Self; 18] = [
        Self::Connect,
        Self::Disconnect,
        Self::ConnectError,
        Self::NewMessage,
        Self::MessagesRead,
        Self::MessageError,
        Self::UserOnline,
        Self::UserOffline,
        Self::UserStatusChange,
        Self::OnlineStatusResponse,
        Self::TypingStart,
        Self::TypingStop,
        Self::NewLike,
        Self::NewMatch,
        Self::PrivacySettingsUpdated,
        Self::UnreadCountUpdate,
        Self::ConversationRead,
        Self::Other,
    ];

    /// Consumer-facing name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::ConnectError => "connectError",
            Self::NewMessage => "newMessage",
            Self::MessagesRead => "messagesRead",
            Self::MessageError => "messageError",
            Self::UserOnline => "userOnline",
            Self::UserOffline => "userOffline",
            Self::UserStatusChange => "userStatusChange",
            Self::OnlineStatusResponse => "onlineStatusResponse",
            Self::TypingStart => "typingStart",
            Self::TypingStop => "typingStop",
            Self::NewLike => "newLike",
            Self::NewMatch => "newMatch",
            Self::PrivacySettingsUpdated => "privacySettingsUpdated",
            Self::UnreadCountUpdate => "unreadCountUpdate",
            Self::ConversationRead => "conversationRead",
            Self::Other => "other",
        }
    }

    /// Name of the server event carrying this kind, if it comes off the wire
    #[must_use]
    pub const fn wire_name(self) -> Option<&'static str> {
        match self {
            Self::Connect | Self::Disconnect | Self::ConnectError | Self::Other => None,
            Self::NewMessage => Some("new_message"),
            Self::MessagesRead => Some("messages_read"),
            Self::MessageError => Some("message_error"),
            Self::UserOnline => Some("user_online"),
            Self::UserOffline => Some("user_offline"),
            Self::UserStatusChange => Some("user_status_change"),
            Self::OnlineStatusResponse => Some("online_status_response"),
            Self::TypingStart => Some("user_typing_start"),
            Self::TypingStop => Some("user_typing_stop"),
            Self::NewLike => Some("new_like"),
            Self::NewMatch => Some("new_match"),
            Self::PrivacySettingsUpdated => Some("privacy_settings_updated"),
            Self::UnreadCountUpdate => Some("unread_count_update"),
            Self::ConversationRead => Some("conversation_read"),
        }
    }

    /// Resolve a server event name
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.wire_name() == Some(name))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
