//! Request payloads for outbound operations

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::events::MessageType;
use crate::value_objects::{ConversationId, DeviceId, MatchId, MessageId, PresenceStatus, UserId};

/// `send_message`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub conversation_id: ConversationId,
    pub content: String,
    pub message_type: MessageType,
    pub receiver_id: Option<UserId>,
}

impl SendMessageRequest {
    /// Create a text message
    #[must_use]
    pub fn text(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self {
            conversation_id,
            content: content.into(),
            message_type: MessageType::Text,
            receiver_id: None,
        }
    }

    #[must_use]
    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    #[must_use]
    pub fn with_receiver(mut self, receiver_id: UserId) -> Self {
        self.receiver_id = Some(receiver_id);
        self
    }
}

/// `mark_as_read`; no message ids means every unread message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsReadRequest {
    pub conversation_id: ConversationId,
    pub message_ids: Option<Vec<MessageId>>,
}

/// Payload naming a single conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    pub conversation_id: ConversationId,
}

/// `update_last_read`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastReadRequest {
    pub conversation_id: ConversationId,
    pub message_id: MessageId,
}

/// `update_online_status`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineStatusUpdate {
    pub is_online: bool,
    pub status: PresenceStatus,
}

impl OnlineStatusUpdate {
    /// Build an update; without an explicit status the flag decides online/offline
    #[must_use]
    pub fn new(is_online: bool, status: Option<PresenceStatus>) -> Self {
        Self {
            is_online,
            status: status.unwrap_or_else(|| PresenceStatus::from_online(is_online)),
        }
    }
}

/// `user_like` and `user_unlike`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub target_user_id: UserId,
}

/// `mark_like_viewed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    pub match_id: MatchId,
}

/// Paged listing for `get_matches` and `get_likes`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

/// Privacy settings stored server-side.
///
/// Only `showLastActive` and `showOnlineStatus` are interpreted; any other field is kept
/// as-is so updates do not drop settings this client does not know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySettings {
    #[serde(default = "default_true")]
    pub show_last_active: bool,
    #[serde(default = "default_true")]
    pub show_online_status: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            show_last_active: true,
            show_online_status: true,
            extra: Map::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Device registration sent to the REST layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration {
    pub push_token: String,
    pub platform: String,
    pub app_version: String,
    pub device_id: DeviceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_send_message_payload() {
        let request = SendMessageRequest::text(ConversationId::from("c1"), "hi")
            .with_receiver(UserId::from("u2"));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({
                "conversationId": "c1",
                "content": "hi",
                "messageType": "text",
                "receiverId": "u2"
            })
        );
    }

    #[test]
    fn test_mark_as_read_all_serializes_null() {
        let request = MarkAsReadRequest {
            conversation_id: ConversationId::from("c1"),
            message_ids: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messageIds"], Value::Null);
    }

    #[test]
    fn test_online_status_update_default_status() {
        assert_eq!(
            OnlineStatusUpdate::new(true, None).status,
            PresenceStatus::Online
        );
        assert_eq!(
            OnlineStatusUpdate::new(false, None).status,
            PresenceStatus::Offline
        );
        assert_eq!(
            OnlineStatusUpdate::new(true, Some(PresenceStatus::Away)).status,
            PresenceStatus::Away
        );
    }

    #[test]
    fn test_privacy_settings_keeps_unknown_fields() {
        let settings: PrivacySettings =
            serde_json::from_value(json!({ "showLastActive": false, "showDistance": true }))
                .unwrap();
        assert!(!settings.show_last_active);
        assert!(settings.show_online_status);

        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["showDistance"], json!(true));
    }
}
