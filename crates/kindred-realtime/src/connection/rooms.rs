//! Conversation room membership
//!
//! Membership is local bookkeeping first: joins made while offline are recorded and
//! announced by the replay that follows every successful connect.

use kindred_core::{ClientOp, ConversationId, ConversationRequest};
use tracing::debug;

use super::ack::EmitOutcome;
use super::client::{to_payload, RealtimeClient};

/// Joined rooms, in join order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RoomMembership {
    rooms: Vec<ConversationId>,
}

impl RoomMembership {
    /// Returns `false` if the room was already joined
    pub(crate) fn join(&mut self, conversation_id: ConversationId) -> bool {
        if self.rooms.contains(&conversation_id) {
            return false;
        }
        self.rooms.push(conversation_id);
        true
    }

    pub(crate) fn leave(&mut self, conversation_id: &ConversationId) -> bool {
        let before = self.rooms.len();
        self.rooms.retain(|room| room != conversation_id);
        self.rooms.len() != before
    }

    pub(crate) fn contains(&self, conversation_id: &ConversationId) -> bool {
        self.rooms.contains(conversation_id)
    }

    pub(crate) fn snapshot(&self) -> Vec<ConversationId> {
        self.rooms.clone()
    }

    pub(crate) fn clear(&mut self) {
        self.rooms.clear();
    }
}

fn room_payload(conversation_id: &ConversationId) -> serde_json::Value {
    to_payload(&ConversationRequest {
        conversation_id: conversation_id.clone(),
    })
}

impl RealtimeClient {
    /// Join a conversation room.
    ///
    /// Returns [`EmitOutcome::Deferred`] when offline; the room is announced on the
    /// next connect.
    pub fn join_conversation(&self, conversation_id: &ConversationId) -> EmitOutcome {
        let mut state = self.inner.session.lock();
        if !state.rooms.join(conversation_id.clone()) {
            debug!(room = %conversation_id, "Room already joined");
        }
        self.inner.announce_locked(
            &state,
            ClientOp::JoinConversation,
            room_payload(conversation_id),
        )
    }

    /// Leave a conversation room
    pub fn leave_conversation(&self, conversation_id: &ConversationId) -> EmitOutcome {
        let mut state = self.inner.session.lock();
        if !state.rooms.leave(conversation_id) {
            debug!(room = %conversation_id, "Leaving a room that was not joined");
        }
        self.inner.announce_locked(
            &state,
            ClientOp::LeaveConversation,
            room_payload(conversation_id),
        )
    }

    #[must_use]
    pub fn joined_rooms(&self) -> Vec<ConversationId> {
        self.inner.session.lock().rooms.snapshot()
    }

    #[must_use]
    pub fn is_in_room(&self, conversation_id: &ConversationId) -> bool {
        self.inner.session.lock().rooms.contains(conversation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::super::client::test_support::*;
    use super::*;
    use crate::transport::mock::MockTransport;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_membership_is_a_set() {
        let mut rooms = RoomMembership::default();
        assert!(rooms.join(ConversationId::from("c1")));
        assert!(!rooms.join(ConversationId::from("c1")));
        assert!(rooms.join(ConversationId::from("c2")));
        assert_eq!(
            rooms.snapshot(),
            vec![ConversationId::from("c1"), ConversationId::from("c2")]
        );

        assert!(rooms.leave(&ConversationId::from("c1")));
        assert!(!rooms.leave(&ConversationId::from("c1")));
        assert!(!rooms.contains(&ConversationId::from("c1")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rooms_reannounced_once_after_reconnect() {
        let (client, transport) = connected_client().await;
        let rooms: Vec<ConversationId> =
            (1..=3).map(|i| ConversationId::new(format!("c{i}"))).collect();
        for room in &rooms {
            assert_eq!(client.join_conversation(room), EmitOutcome::Sent);
        }
        assert_eq!(transport.sent_named("join_conversation").len(), 3);

        transport.clear_sent();
        bounce(&client, &transport).await;

        let rejoined: Vec<_> = transport
            .sent_named("join_conversation")
            .into_iter()
            .filter_map(|f| f.d)
            .collect();
        assert_eq!(
            rejoined,
            vec![
                json!({ "conversationId": "c1" }),
                json!({ "conversationId": "c2" }),
                json!({ "conversationId": "c3" }),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_while_offline_is_deferred() {
        let transport = Arc::new(MockTransport::new());
        let client = client_with(&transport);

        let room = ConversationId::from("c1");
        assert_eq!(client.join_conversation(&room), EmitOutcome::Deferred);
        assert!(client.is_in_room(&room));

        connect(&client, &transport).await;
        assert!(transport.sent_named("join_conversation").is_empty());
        settle().await;
        assert_eq!(transport.sent_named("join_conversation").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_left_room_is_not_rejoined() {
        let (client, transport) = connected_client().await;
        let room = ConversationId::from("c1");
        client.join_conversation(&room);
        assert_eq!(client.leave_conversation(&room), EmitOutcome::Sent);
        assert_eq!(transport.sent_named("leave_conversation").len(), 1);

        transport.clear_sent();
        bounce(&client, &transport).await;
        assert!(transport.sent_named("join_conversation").is_empty());
        assert!(client.joined_rooms().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_clears_rooms() {
        let (client, transport) = connected_client().await;
        client.join_conversation(&ConversationId::from("c1"));

        client.disconnect();
        assert!(client.joined_rooms().is_empty());

        transport.clear_sent();
        connect(&client, &transport).await;
        settle().await;
        assert!(transport.sent_named("join_conversation").is_empty());
    }
}
