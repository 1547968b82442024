//! Acknowledgement correlation
//!
//! Request frames carry an id; the server echoes it on the ack frame. The table maps
//! ids back to the waiting caller.

use dashmap::DashMap;
use kindred_common::{ClientError, ClientResult};
use kindred_core::AckResponse;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::queue::AckSender;

#[derive(Default)]
pub(crate) struct AckTable {
    next_id: AtomicU64,
    pending: DashMap<u64, AckSender>,
}

impl AckTable {
    /// Allocate a frame id without registering a waiter yet
    pub(crate) fn reserve(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn insert(&self, id: u64, completion: AckSender) {
        self.pending.insert(id, completion);
    }

    pub(crate) fn register(&self, completion: AckSender) -> u64 {
        let id = self.reserve();
        self.insert(id, completion);
        id
    }

    pub(crate) fn take(&self, id: u64) -> Option<AckSender> {
        self.pending.remove(&id).map(|(_, completion)| completion)
    }

    /// Deliver a reply; `false` when nobody is waiting for `id`
    pub(crate) fn resolve(&self, id: u64, data: Value) -> bool {
        match self.take(id) {
            Some(completion) => {
                let _ = completion.send(Ok(data));
                true
            }
            None => false,
        }
    }

    /// Fail every outstanding request
    pub(crate) fn fail_all(&self, make_error: impl Fn() -> ClientError) -> usize {
        let ids: Vec<u64> = self.pending.iter().map(|entry| *entry.key()).collect();
        let mut failed = 0;
        for id in ids {
            if let Some(completion) = self.take(id) {
                let _ = completion.send(Err(make_error()));
                failed += 1;
            }
        }
        failed
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

/// What happened to an emit at the time of the call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmitOutcome {
    /// Handed to the transport
    Sent,
    /// Buffered until the next successful connect
    Queued,
    /// Recorded locally; announced to the server on the next connect
    Deferred,
    /// The transport refused the frame
    Failed,
}

impl EmitOutcome {
    #[must_use]
    pub const fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Table slot an acknowledgement gives back when it goes away
#[derive(Debug)]
struct AckSlot {
    id: u64,
    table: Weak<AckTable>,
}

/// Pending server reply for an emit.
///
/// Resolves with the reply payload, [`ClientError::Cancelled`] when the session ends
/// first, or the transport error that prevented delivery. Dropping it, including on
/// timeout, releases the waiting slot.
#[derive(Debug)]
#[must_use = "the reply is lost unless the acknowledgement is awaited"]
pub struct Acknowledgement {
    outcome: EmitOutcome,
    reply: oneshot::Receiver<ClientResult<Value>>,
    slot: Option<AckSlot>,
}

impl Acknowledgement {
    pub(crate) fn new(outcome: EmitOutcome, reply: oneshot::Receiver<ClientResult<Value>>) -> Self {
        Self {
            outcome,
            reply,
            slot: None,
        }
    }

    /// Acknowledgement that removes entry `id` from `table` when dropped
    pub(crate) fn tracked(
        outcome: EmitOutcome,
        reply: oneshot::Receiver<ClientResult<Value>>,
        id: u64,
        table: Weak<AckTable>,
    ) -> Self {
        Self {
            outcome,
            reply,
            slot: Some(AckSlot { id, table }),
        }
    }

    #[must_use]
    pub fn outcome(&self) -> EmitOutcome {
        self.outcome
    }

    /// Wait for the reply at most `limit`
    ///
    /// # Errors
    /// [`ClientError::RemoteQuery`] on timeout, otherwise whatever the reply resolves to
    pub async fn with_timeout(self, limit: Duration) -> ClientResult<AckResponse> {
        match tokio::time::timeout(limit, self).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::RemoteQuery(format!(
                "no reply within {}ms",
                limit.as_millis()
            ))),
        }
    }
}

impl Future for Acknowledgement {
    type Output = ClientResult<AckResponse>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.reply).poll(cx).map(|result| match result {
            Ok(Ok(value)) => Ok(AckResponse::new(value)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ClientError::Cancelled),
        })
    }
}

impl Drop for Acknowledgement {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            if let Some(table) = slot.table.upgrade() {
                table.take(slot.id);
            }
        }
    }
}
