//! Typing indicators with automatic stop

use kindred_core::{ClientOp, ConversationId, ConversationRequest};
use std::sync::Arc;
use tracing::debug;

use super::client::{to_payload, ClientInner, RealtimeClient, TypingTimer};
use super::state::ConnectionState;
use crate::queue::PendingEvent;

fn typing_event(op: ClientOp, conversation_id: &ConversationId) -> PendingEvent {
    let payload = to_payload(&ConversationRequest {
        conversation_id: conversation_id.clone(),
    });
    PendingEvent::new(op, payload, None)
}

impl RealtimeClient {
    /// Announce typing in a conversation.
    ///
    /// Every call re-sends `typing_start` and restarts the idle timer; when it fires
    /// `typing_stop` is sent. Returns `false` (and does nothing) when not connected.
    pub fn start_typing(&self, conversation_id: &ConversationId) -> bool {
        let mut state = self.inner.session.lock();
        if state.connection != ConnectionState::Connected {
            return false;
        }

        if let Some(timer) = state.typing.remove(conversation_id) {
            timer.handle.abort();
        }
        self.inner
            .emit_locked(&mut state, typing_event(ClientOp::TypingStart, conversation_id));

        state.typing_generation += 1;
        let generation = state.typing_generation;
        let handle = spawn_idle_timer(&self.inner, conversation_id.clone(), generation);
        state
            .typing
            .insert(conversation_id.clone(), TypingTimer { generation, handle });
        true
    }

    /// Stop the typing indicator. Returns `false` when not connected.
    pub fn stop_typing(&self, conversation_id: &ConversationId) -> bool {
        let mut state = self.inner.session.lock();
        if let Some(timer) = state.typing.remove(conversation_id) {
            timer.handle.abort();
        }
        if state.connection != ConnectionState::Connected {
            return false;
        }
        self.inner
            .emit_locked(&mut state, typing_event(ClientOp::TypingStop, conversation_id));
        true
    }

    #[must_use]
    pub fn is_typing(&self, conversation_id: &ConversationId) -> bool {
        self.inner.session.lock().typing.contains_key(conversation_id)
    }
}

fn spawn_idle_timer(
    inner: &Arc<ClientInner>,
    conversation_id: ConversationId,
    generation: u64,
) -> tokio::task::JoinHandle<()> {
    let weak = Arc::downgrade(inner);
    let idle = inner.options.typing_idle;
    tokio::spawn(async move {
        tokio::time::sleep(idle).await;
        if let Some(inner) = weak.upgrade() {
            inner.expire_typing(&conversation_id, generation);
        }
    })
}

impl ClientInner {
    fn expire_typing(&self, conversation_id: &ConversationId, generation: u64) {
        let mut state = self.session.lock();
        // A newer start_typing owns the slot
        if state
            .typing
            .get(conversation_id)
            .map_or(true, |timer| timer.generation != generation)
        {
            return;
        }
        state.typing.remove(conversation_id);

        if state.connection == ConnectionState::Connected {
            debug!(room = %conversation_id, "Typing indicator expired");
            self.emit_locked(&mut state, typing_event(ClientOp::TypingStop, conversation_id));
        }
    }
}
