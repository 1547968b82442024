//! Outbound event queue.

mod outbound_queue;

pub use outbound_queue::{AckSender, OutboundQueue, PendingEvent};
