//! # kindred-core
//!
//! Domain layer for the realtime client: identifiers, presence vocabulary, inbound event
//! schemas, outbound request payloads, the notification model, and the ports the client
//! consumes. This crate has no dependency on transports, storage, or runtimes.

pub mod error;
pub mod events;
pub mod notification;
pub mod outbound;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use error::DomainError;
pub use events::{
    ChatMessage, ConnectErrorEvent, ConnectEvent, ConversationReadEvent, DisconnectEvent,
    EventKind, LikeEvent, LikeInfo, MatchEvent, MatchInfo, MessageErrorEvent, MessageSender,
    MessageType, MessagesReadEvent, NewMessageEvent, OnlineStatusSnapshot,
    PrivacySettingsEvent, SenderRef, ServerEvent, TypingEvent, UnreadCountEvent,
    UserPresenceEvent,
};
pub use notification::{
    Notification, NotificationCategory, NotificationChannel, NotificationRoute,
    NotificationSettings, NotificationSettingsPatch,
};
pub use outbound::{
    AckResponse, ClientOp, ConversationRequest, DeviceRegistration, LastReadRequest,
    LikeRequest, MarkAsReadRequest, MatchRequest, OnlineStatusUpdate, PageRequest,
    PrivacySettings, SendMessageRequest,
};
pub use traits::{
    AuthProvider, DeviceRegistrationApi, KeyValueStore, NotificationPresenter, PortResult,
    PushProvider, RegisteredDevice,
};
pub use value_objects::{ConversationId, DeviceId, MatchId, MessageId, PresenceStatus, UserId};
