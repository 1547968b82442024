//! Presence storage module.
//!
//! Tracks remote users' status with a freshness bound.

mod presence_cache;
mod subscriptions;

pub use presence_cache::{PresenceCache, PresenceEntry};
pub use subscriptions::StatusSubscriptions;
