//! Notification payload handed to the presentation layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::settings::NotificationCategory;
use crate::value_objects::{ConversationId, DeviceId, MatchId, MessageId, UserId};

/// Platform channel a notification is posted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Chat,
    Social,
    System,
}

impl NotificationChannel {
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Social => "social",
            Self::System => "system",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Chat => "Messages",
            Self::Social => "Likes & Matches",
            Self::System => "System",
        }
    }
}

/// Where tapping the notification should lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "screen", rename_all = "camelCase")]
pub enum NotificationRoute {
    #[serde(rename_all = "camelCase")]
    Chat {
        conversation_id: ConversationId,
        message_id: MessageId,
        sender_id: UserId,
        #[serde(skip_serializing_if = "Option::is_none")]
        sender_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        profile_picture: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Likes {
        user_id: UserId,
        #[serde(skip_serializing_if = "Option::is_none")]
        match_id: Option<MatchId>,
    },
    #[serde(rename_all = "camelCase")]
    Match { match_id: MatchId, user_id: UserId },
}

/// A notification ready for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Stable identifier, derived from the dedup key
    pub id: String,
    pub category: NotificationCategory,
    pub channel: NotificationChannel,
    pub title: String,
    pub body: String,
    pub route: NotificationRoute,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<DeviceId>,
    pub sound: bool,
    pub vibrate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<u32>,
    pub created_at: DateTime<Utc>,
}
