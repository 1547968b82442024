//! Tagged inbound event

use serde::Serialize;
use serde_json::Value;

use super::event_kind::EventKind;
use super::payloads::{
    ConnectErrorEvent, ConnectEvent, ConversationReadEvent, DisconnectEvent, LikeEvent,
    MatchEvent, MessageErrorEvent, MessagesReadEvent, NewMessageEvent, OnlineStatusSnapshot,
    PrivacySettingsEvent, TypingEvent, UnreadCountEvent, UserPresenceEvent,
};
use crate::value_objects::UserId;

/// Every event delivered to dispatcher subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    // =========================================================================
    // Connection Events
    // =========================================================================
    Connect(ConnectEvent),
    Disconnect(DisconnectEvent),
    ConnectError(ConnectErrorEvent),

    // =========================================================================
    // Message Events
    // =========================================================================
    NewMessage(NewMessageEvent),
    MessagesRead(MessagesReadEvent),
    MessageError(MessageErrorEvent),
    UnreadCountUpdate(UnreadCountEvent),
    ConversationRead(ConversationReadEvent),

    // =========================================================================
    // Presence Events
    // =========================================================================
    UserOnline(UserPresenceEvent),
    UserOffline(UserPresenceEvent),
    UserStatusChange(UserPresenceEvent),
    OnlineStatusResponse(OnlineStatusSnapshot),
    TypingStart(TypingEvent),
    TypingStop(TypingEvent),

    // =========================================================================
    // Social Events
    // =========================================================================
    NewLike(LikeEvent),
    NewMatch(MatchEvent),
    PrivacySettingsUpdated(PrivacySettingsEvent),

    /// Wire event without a dedicated schema
    Other { name: String, data: Value },
}

impl ServerEvent {
    /// Decode a wire event by name.
    ///
    /// Unknown names decode to [`ServerEvent::Other`]; a known name with a payload that
    /// does not match its schema is an error.
    pub fn decode(name: &str, data: Value) -> Result<Self, serde_json::Error> {
        let Some(kind) = EventKind::from_wire(name) else {
            return Ok(Self::Other {
                name: name.to_string(),
                data,
            });
        };

        let event = match kind {
            EventKind::NewMessage => Self::NewMessage(serde_json::from_value(data)?),
            EventKind::MessagesRead => Self::MessagesRead(serde_json::from_value(data)?),
            EventKind::MessageError => Self::MessageError(serde_json::from_value(data)?),
            EventKind::UnreadCountUpdate => {
                Self::UnreadCountUpdate(serde_json::from_value(data)?)
            }
            EventKind::ConversationRead => Self::ConversationRead(serde_json::from_value(data)?),
            EventKind::UserOnline => Self::UserOnline(serde_json::from_value(data)?),
            EventKind::UserOffline => Self::UserOffline(serde_json::from_value(data)?),
            EventKind::UserStatusChange => Self::UserStatusChange(serde_json::from_value(data)?),
            EventKind::OnlineStatusResponse => {
                Self::OnlineStatusResponse(serde_json::from_value(data)?)
            }
            EventKind::TypingStart => Self::TypingStart(serde_json::from_value(data)?),
            EventKind::TypingStop => Self::TypingStop(serde_json::from_value(data)?),
            EventKind::NewLike => Self::NewLike(serde_json::from_value(data)?),
            EventKind::NewMatch => Self::NewMatch(serde_json::from_value(data)?),
            EventKind::PrivacySettingsUpdated => {
                Self::PrivacySettingsUpdated(serde_json::from_value(data)?)
            }
            EventKind::Connect | EventKind::Disconnect | EventKind::ConnectError | EventKind::Other => {
                Self::Other {
                    name: name.to_string(),
                    data,
                }
            }
        };

        Ok(event)
    }

    /// Subscription key for this event
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connect(_) => EventKind::Connect,
            Self::Disconnect(_) => EventKind::Disconnect,
            Self::ConnectError(_) => EventKind::ConnectError,
            Self::NewMessage(_) => EventKind::NewMessage,
            Self::MessagesRead(_) => EventKind::MessagesRead,
            Self::MessageError(_) => EventKind::MessageError,
            Self::UnreadCountUpdate(_) => EventKind::UnreadCountUpdate,
            Self::ConversationRead(_) => EventKind::ConversationRead,
            Self::UserOnline(_) => EventKind::UserOnline,
            Self::UserOffline(_) => EventKind::UserOffline,
            Self::UserStatusChange(_) => EventKind::UserStatusChange,
            Self::OnlineStatusResponse(_) => EventKind::OnlineStatusResponse,
            Self::TypingStart(_) => EventKind::TypingStart,
            Self::TypingStop(_) => EventKind::TypingStop,
            Self::NewLike(_) => EventKind::NewLike,
            Self::NewMatch(_) => EventKind::NewMatch,
            Self::PrivacySettingsUpdated(_) => EventKind::PrivacySettingsUpdated,
            Self::Other { .. } => EventKind::Other,
        }
    }

    /// The user whose action produced this event, when the event has one
    #[must_use]
    pub fn actor_id(&self) -> Option<&UserId> {
        match self {
            Self::NewMessage(event) => Some(event.sender_id()),
            Self::NewLike(event) => Some(&event.like.user_id),
            Self::NewMatch(event) => Some(&event.match_info.user_id),
            Self::TypingStart(event) | Self::TypingStop(event) => Some(&event.user_id),
            Self::UserOnline(event) | Self::UserOffline(event) | Self::UserStatusChange(event) => {
                Some(&event.user_id)
            }
            Self::MessagesRead(event) => event.reader_id.as_ref(),
            _ => None,
        }
    }
}
