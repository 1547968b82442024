//! FIFO of emits made while the socket was down

use kindred_common::{ClientError, ClientResult};
use serde_json::Value;
use std::collections::VecDeque;
use tokio::sync::oneshot;

/// Completion for an emit that expects a server reply
pub type AckSender = oneshot::Sender<ClientResult<Value>>;

/// An emit waiting for a connection
#[derive(Debug)]
pub struct PendingEvent {
    pub name: String,
    pub payload: Value,
    /// Frame id reserved for the reply, if the caller asked for one
    pub ack_id: Option<u64>,
    pub completion: Option<AckSender>,
}

impl PendingEvent {
    #[must_use]
    pub fn new(name: impl Into<String>, payload: Value, completion: Option<AckSender>) -> Self {
        Self {
            name: name.into(),
            payload,
            ack_id: None,
            completion,
        }
    }

    /// An emit whose reply is correlated under a pre-reserved id
    #[must_use]
    pub fn request(
        name: impl Into<String>,
        payload: Value,
        ack_id: u64,
        completion: AckSender,
    ) -> Self {
        Self {
            name: name.into(),
            payload,
            ack_id: Some(ack_id),
            completion: Some(completion),
        }
    }

    /// The caller stopped waiting for the reply
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.completion.as_ref().is_some_and(AckSender::is_closed)
    }

    /// Resolve the completion, if any, with an error
    pub fn fail(self, error: ClientError) {
        if let Some(completion) = self.completion {
            let _ = completion.send(Err(error));
        }
    }
}

/// Ordered buffer of pending events; entries are never merged or deduplicated
#[derive(Debug, Default)]
pub struct OutboundQueue {
    events: VecDeque<PendingEvent>,
}

impl OutboundQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: PendingEvent) {
        self.events.push_back(event);
    }

    /// Put an entry back at the head, ahead of everything queued after it
    pub fn push_front(&mut self, event: PendingEvent) {
        self.events.push_front(event);
    }

    pub fn pop(&mut self) -> Option<PendingEvent> {
        self.events.pop_front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Names of queued events, head first
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.name.as_str()).collect()
    }

    /// Drop every entry; completions resolve with [`ClientError::Cancelled`].
    ///
    /// Returns the number of discarded entries.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.events.len();
        for event in self.events.drain(..) {
            event.fail(ClientError::Cancelled);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fifo_order() {
        let mut queue = OutboundQueue::new();
        queue.push(PendingEvent::new("a", json!(1), None));
        queue.push(PendingEvent::new("b", json!(2), None));
        queue.push(PendingEvent::new("a", json!(1), None));

        assert_eq!(queue.names(), vec!["a", "b", "a"]);
        assert_eq!(queue.pop().unwrap().name, "a");

        let b = queue.pop().unwrap();
        queue.push_front(b);
        assert_eq!(queue.names(), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_cancel_all_resolves_completions() {
        let mut queue = OutboundQueue::new();
        let (tx, rx) = oneshot::channel();
        queue.push(PendingEvent::new("send_message", json!({}), Some(tx)));
        queue.push(PendingEvent::new("typing_start", json!({}), None));

        assert_eq!(queue.cancel_all(), 2);
        assert!(queue.is_empty());
        assert!(matches!(rx.await.unwrap(), Err(ClientError::Cancelled)));
    }

    #[test]
    fn test_abandoned_request() {
        let (tx, rx) = oneshot::channel();
        let event = PendingEvent::request("get_online_status", json!([]), 7, tx);
        assert_eq!(event.ack_id, Some(7));
        assert!(!event.is_abandoned());

        drop(rx);
        assert!(event.is_abandoned());
        assert!(!PendingEvent::new("typing_start", json!({}), None).is_abandoned());
    }
}
