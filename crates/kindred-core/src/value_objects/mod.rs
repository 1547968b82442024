//! Value objects - identifiers and status vocabulary

mod ids;
mod presence_status;

pub use ids::{ConversationId, DeviceId, MatchId, MessageId, UserId};
pub use presence_status::PresenceStatus;
