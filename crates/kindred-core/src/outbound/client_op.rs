//! Outbound operation names

use std::fmt;

/// Operations the client sends to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientOp {
    // Messaging
    SendMessage,
    MarkAsRead,
    MarkConversationRead,
    UpdateLastRead,
    GetUnreadCounts,
    // Rooms
    JoinConversation,
    LeaveConversation,
    TypingStart,
    TypingStop,
    // Presence
    UpdateOnlineStatus,
    SubscribeToStatus,
    UnsubscribeFromStatus,
    GetOnlineStatus,
    // Privacy
    UpdatePrivacySettings,
    GetPrivacySettings,
    // Likes and matches
    UserLike,
    UserUnlike,
    ViewLikes,
    MarkLikeViewed,
    GetMatches,
    GetLikes,
    // Session
    UserLogin,
    UserLogout,
}

impl ClientOp {
    /// Wire event name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SendMessage => "send_message",
            Self::MarkAsRead => "mark_as_read",
            Self::MarkConversationRead => "mark_conversation_read",
            Self::UpdateLastRead => "update_last_read",
            Self::GetUnreadCounts => "get_unread_counts",
            Self::JoinConversation => "join_conversation",
            Self::LeaveConversation => "leave_conversation",
            Self::TypingStart => "typing_start",
            Self::TypingStop => "typing_stop",
            Self::UpdateOnlineStatus => "update_online_status",
            Self::SubscribeToStatus => "subscribe_to_status",
            Self::UnsubscribeFromStatus => "unsubscribe_from_status",
            Self::GetOnlineStatus => "get_online_status",
            Self::UpdatePrivacySettings => "update_privacy_settings",
            Self::GetPrivacySettings => "get_privacy_settings",
            Self::UserLike => "user_like",
            Self::UserUnlike => "user_unlike",
            Self::ViewLikes => "view_likes",
            Self::MarkLikeViewed => "mark_like_viewed",
            Self::GetMatches => "get_matches",
            Self::GetLikes => "get_likes",
            Self::UserLogin => "user_login",
            Self::UserLogout => "user_logout",
        }
    }
}

impl fmt::Display for ClientOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ClientOp> for String {
    fn from(op: ClientOp) -> Self {
        op.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(ClientOp::SendMessage.as_str(), "send_message");
        assert_eq!(ClientOp::SubscribeToStatus.as_str(), "subscribe_to_status");
        assert_eq!(ClientOp::TypingStop.to_string(), "typing_stop");
        assert_eq!(String::from(ClientOp::GetOnlineStatus), "get_online_status");
    }
}
