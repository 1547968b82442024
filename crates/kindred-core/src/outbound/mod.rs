//! Outbound operations and their payloads

mod ack;
mod client_op;
mod requests;

pub use ack::AckResponse;
pub use client_op::ClientOp;
pub use requests::{
    ConversationRequest, DeviceRegistration, LastReadRequest, LikeRequest, MarkAsReadRequest,
    MatchRequest, OnlineStatusUpdate, PageRequest, PrivacySettings, SendMessageRequest,
};
