//! Inbound realtime events
//!
//! Every wire event the client understands has an explicit payload schema. Events that
//! the client does not recognise are still delivered, untyped, as [`ServerEvent::Other`].

mod event_kind;
mod payloads;
mod server_event;

pub use event_kind::EventKind;
pub use payloads::{
    ChatMessage, ConnectErrorEvent, ConnectEvent, ConversationReadEvent, DisconnectEvent,
    LikeEvent, LikeInfo, MatchEvent, MatchInfo, MessageErrorEvent, MessageSender, MessageType,
    MessagesReadEvent, NewMessageEvent, OnlineStatusSnapshot, PrivacySettingsEvent, SenderRef,
    TypingEvent, UnreadCountEvent, UserPresenceEvent,
};
pub use server_event::ServerEvent;
