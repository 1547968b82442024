//! Event payload schemas
//!
//! Field names follow the server's camelCase JSON. Aliases cover the alternative spellings
//! the server uses for the same field (`_id` versus `id`, `sender` versus `senderId`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::outbound::PrivacySettings;
use crate::value_objects::{ConversationId, MatchId, MessageId, PresenceStatus, UserId};

// ============================================================================
// Connection Events (local)
// ============================================================================

/// Transport reported a successful (re)connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// False for the first connection of a session
    pub reconnected: bool,
}

/// Transport lost the connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectEvent {
    pub reason: String,
    /// Whether the transport keeps retrying
    pub will_reconnect: bool,
}

/// A connection attempt failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectErrorEvent {
    pub message: String,
}

// ============================================================================
// Message Events
// ============================================================================

/// Kind of chat message content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Video,
    Audio,
    Call,
    #[serde(other)]
    Other,
}

/// Sender profile embedded in a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSender {
    #[serde(alias = "_id", alias = "userId")]
    pub id: UserId,
    #[serde(default, alias = "username", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, alias = "avatar", skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// The server sends either a bare sender id or a populated profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SenderRef {
    Id(UserId),
    Profile(MessageSender),
}

impl SenderRef {
    #[must_use]
    pub fn id(&self) -> &UserId {
        match self {
            Self::Id(id) => id,
            Self::Profile(profile) => &profile.id,
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Profile(profile) => profile.name.as_deref(),
        }
    }

    #[must_use]
    pub fn profile_picture(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Profile(profile) => profile.profile_picture.as_deref(),
        }
    }
}

/// A chat message as delivered by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(alias = "_id")]
    pub id: MessageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    #[serde(alias = "sender")]
    pub sender_id: SenderRef,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// `new_message`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessageEvent {
    pub conversation_id: ConversationId,
    pub message: ChatMessage,
}

impl NewMessageEvent {
    #[must_use]
    pub fn sender_id(&self) -> &UserId {
        self.message.sender_id.id()
    }
}

/// `messages_read`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesReadEvent {
    pub conversation_id: ConversationId,
    #[serde(default, alias = "userId", skip_serializing_if = "Option::is_none")]
    pub reader_id: Option<UserId>,
    #[serde(default)]
    pub message_ids: Vec<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
}

/// `message_error`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageErrorEvent {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
}

/// `unread_count_update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    #[serde(default)]
    pub unread_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_unread: Option<u64>,
}

/// `conversation_read`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationReadEvent {
    pub conversation_id: ConversationId,
    #[serde(default, alias = "userId", skip_serializing_if = "Option::is_none")]
    pub reader_id: Option<UserId>,
    #[serde(default)]
    pub read_count: u64,
}

// ============================================================================
// Presence Events
// ============================================================================

/// `user_online`, `user_offline` and `user_status_change`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPresenceEvent {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PresenceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_online: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
}

impl UserPresenceEvent {
    /// Status carried by the event, falling back to the `isOnline` flag and then `fallback`
    #[must_use]
    pub fn effective_status(&self, fallback: PresenceStatus) -> PresenceStatus {
        self.status
            .or_else(|| self.is_online.map(PresenceStatus::from_online))
            .unwrap_or(fallback)
    }
}

/// `online_status_response`: user id to online flag
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OnlineStatusSnapshot {
    pub statuses: HashMap<UserId, bool>,
}

impl OnlineStatusSnapshot {
    /// Iterate the snapshot as presence statuses
    pub fn iter(&self) -> impl Iterator<Item = (&UserId, PresenceStatus)> {
        self.statuses
            .iter()
            .map(|(id, online)| (id, PresenceStatus::from_online(*online)))
    }
}

/// `user_typing_start` and `user_typing_stop`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

// ============================================================================
// Social Events
// ============================================================================

/// Liker details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeInfo {
    /// Identity of this like, when the server sends one
    #[serde(default, alias = "_id", alias = "likeId", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_id: Option<MatchId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl LikeInfo {
    /// Something that tells this like apart from earlier likes by the same user
    #[must_use]
    pub fn event_identity(&self) -> Option<String> {
        self.id
            .clone()
            .or_else(|| self.created_at.map(|at| at.timestamp_millis().to_string()))
    }
}

/// `new_like`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeEvent {
    pub like: LikeInfo,
}

/// Matched user details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    pub match_id: MatchId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// `new_match`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    #[serde(rename = "match")]
    pub match_info: MatchInfo,
}

/// `privacy_settings_updated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySettingsEvent {
    #[serde(alias = "privacySettings")]
    pub settings: PrivacySettings,
}
