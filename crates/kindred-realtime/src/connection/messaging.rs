//! Chat, privacy, like/match and session notices

use chrono::{DateTime, Utc};
use kindred_common::{ClientError, ClientResult};
use kindred_core::{
    AckResponse, ClientOp, ConversationId, ConversationRequest, LastReadRequest, LikeRequest,
    MarkAsReadRequest, MatchId, MatchRequest, MessageId, PageRequest, PrivacySettings,
    PrivacySettingsEvent, SendMessageRequest, ServerEvent, UserId,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::ack::EmitOutcome;
use super::client::{to_payload, RealtimeClient};
use crate::queue::PendingEvent;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionNotice {
    user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    login_time: Option<DateTime<Utc>>,
}

fn empty_payload() -> Value {
    Value::Object(Map::new())
}

/// Reply must carry `success: true`
fn require_success(reply: AckResponse, fallback: &str) -> ClientResult<AckResponse> {
    if reply.is_success() {
        Ok(reply)
    } else {
        Err(ClientError::Rejected(
            reply.error_message().unwrap_or_else(|| fallback.to_string()),
        ))
    }
}

/// Reply must not report an error; bare payloads count as accepted
fn require_accepted(reply: AckResponse, fallback: &str) -> ClientResult<AckResponse> {
    if reply.is_accepted() {
        Ok(reply)
    } else {
        Err(ClientError::Rejected(
            reply.error_message().unwrap_or_else(|| fallback.to_string()),
        ))
    }
}

fn privacy_from_reply(reply: &AckResponse) -> Option<PrivacySettings> {
    let data = reply.data()?;
    let settings = data.get("privacySettings").unwrap_or(data);
    serde_json::from_value(settings.clone()).ok()
}

impl RealtimeClient {
    // ========================================================================
    // Chat
    // ========================================================================

    /// Send a chat message.
    ///
    /// # Errors
    /// [`ClientError::NotConnected`] when offline, [`ClientError::Rejected`] when the
    /// server refuses the message
    pub async fn send_message(&self, request: SendMessageRequest) -> ClientResult<AckResponse> {
        let reply = self
            .request(ClientOp::SendMessage, serde_json::to_value(&request)?)
            .await?;
        require_success(reply, "Failed to send message")
    }

    /// Mark messages as read; `None` marks everything in the conversation
    pub async fn mark_as_read(
        &self,
        conversation_id: &ConversationId,
        message_ids: Option<Vec<MessageId>>,
    ) -> ClientResult<AckResponse> {
        let payload = serde_json::to_value(MarkAsReadRequest {
            conversation_id: conversation_id.clone(),
            message_ids,
        })?;
        let reply = self.request(ClientOp::MarkAsRead, payload).await?;
        require_accepted(reply, "Failed to mark messages as read")
    }

    pub async fn mark_conversation_read(
        &self,
        conversation_id: &ConversationId,
    ) -> ClientResult<AckResponse> {
        let payload = serde_json::to_value(ConversationRequest {
            conversation_id: conversation_id.clone(),
        })?;
        let reply = self.request(ClientOp::MarkConversationRead, payload).await?;
        require_accepted(reply, "Failed to mark conversation as read")
    }

    /// Move the read marker of a conversation to `message_id`
    pub async fn update_last_read(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
    ) -> ClientResult<AckResponse> {
        let payload = serde_json::to_value(LastReadRequest {
            conversation_id: conversation_id.clone(),
            message_id: message_id.clone(),
        })?;
        let reply = self.request(ClientOp::UpdateLastRead, payload).await?;
        require_accepted(reply, "Failed to update read marker")
    }

    /// Unread counts per conversation, as reported by the server
    pub async fn get_unread_counts(&self) -> ClientResult<AckResponse> {
        let reply = self
            .request(ClientOp::GetUnreadCounts, empty_payload())
            .await?;
        require_accepted(reply, "Failed to get unread counts")
    }

    // ========================================================================
    // Privacy
    // ========================================================================

    /// Push new privacy settings.
    ///
    /// The settings the server stored are cached and announced locally as a
    /// `privacySettingsUpdated` event.
    pub async fn update_privacy_settings(
        &self,
        settings: PrivacySettings,
    ) -> ClientResult<PrivacySettings> {
        let payload = serde_json::to_value(&settings)?;
        let reply = self
            .request(ClientOp::UpdatePrivacySettings, payload)
            .await?;
        let reply = require_success(reply, "Failed to update privacy settings")?;

        let stored = privacy_from_reply(&reply).unwrap_or(settings);
        self.inner.session.lock().privacy = Some(stored.clone());
        info!("Privacy settings updated");

        self.inner
            .dispatcher
            .dispatch(&ServerEvent::PrivacySettingsUpdated(PrivacySettingsEvent {
                settings: stored.clone(),
            }));
        Ok(stored)
    }

    /// Current privacy settings; offline this answers from the cache
    ///
    /// # Errors
    /// [`ClientError::NotConnected`] when offline with nothing cached
    pub async fn get_privacy_settings(&self) -> ClientResult<PrivacySettings> {
        if !self.is_connected() {
            return self
                .cached_privacy_settings()
                .ok_or(ClientError::NotConnected);
        }

        let reply = self
            .request(ClientOp::GetPrivacySettings, empty_payload())
            .await?;
        let reply = require_accepted(reply, "Failed to get privacy settings")?;
        let settings = privacy_from_reply(&reply).ok_or_else(|| {
            ClientError::InvalidPayload("privacy settings missing from reply".to_string())
        })?;

        self.inner.session.lock().privacy = Some(settings.clone());
        Ok(settings)
    }

    #[must_use]
    pub fn cached_privacy_settings(&self) -> Option<PrivacySettings> {
        self.inner.session.lock().privacy.clone()
    }

    // ========================================================================
    // Likes & matches
    // ========================================================================

    pub async fn send_like(&self, target_user_id: &UserId) -> ClientResult<AckResponse> {
        let payload = serde_json::to_value(LikeRequest {
            target_user_id: target_user_id.clone(),
        })?;
        let reply = self.request(ClientOp::UserLike, payload).await?;
        require_success(reply, "Failed to send like")
    }

    pub async fn send_unlike(&self, target_user_id: &UserId) -> ClientResult<AckResponse> {
        let payload = serde_json::to_value(LikeRequest {
            target_user_id: target_user_id.clone(),
        })?;
        let reply = self.request(ClientOp::UserUnlike, payload).await?;
        require_success(reply, "Failed to remove like")
    }

    pub fn view_likes(&self) -> EmitOutcome {
        self.emit_op(ClientOp::ViewLikes, empty_payload())
    }

    pub fn mark_like_viewed(&self, match_id: &MatchId) -> EmitOutcome {
        let payload = to_payload(&MatchRequest {
            match_id: match_id.clone(),
        });
        self.emit_op(ClientOp::MarkLikeViewed, payload)
    }

    pub fn get_matches(&self, page: PageRequest) -> EmitOutcome {
        self.emit_op(ClientOp::GetMatches, to_payload(&page))
    }

    pub fn get_likes(&self, page: PageRequest) -> EmitOutcome {
        self.emit_op(ClientOp::GetLikes, to_payload(&page))
    }

    // ========================================================================
    // Session notices
    // ========================================================================

    /// Tell the server the signed-in user opened the app
    ///
    /// # Errors
    /// [`ClientError::AuthMissing`] when nobody is signed in
    pub async fn notify_login(&self) -> ClientResult<EmitOutcome> {
        let user_id = self
            .auth()
            .current_user_id()
            .await
            .ok_or(ClientError::AuthMissing)?;
        debug!(user_id = %user_id, "Announcing login");
        Ok(self.emit_op(
            ClientOp::UserLogin,
            to_payload(&SessionNotice {
                user_id,
                login_time: Some(Utc::now()),
            }),
        ))
    }

    pub async fn notify_logout(&self) -> ClientResult<EmitOutcome> {
        let user_id = self
            .auth()
            .current_user_id()
            .await
            .ok_or(ClientError::AuthMissing)?;
        Ok(self.emit_op(
            ClientOp::UserLogout,
            to_payload(&SessionNotice {
                user_id,
                login_time: None,
            }),
        ))
    }

    fn emit_op(&self, op: ClientOp, payload: Value) -> EmitOutcome {
        let mut state = self.inner.session.lock();
        self.inner
            .emit_locked(&mut state, PendingEvent::new(op, payload, None))
    }
}
