//! Event broadcasting
//!
//! In-process fan-out of inbound events to subscribed handlers.

mod dispatcher;

pub use dispatcher::{DispatchReport, EventDispatcher, EventHandler, HandlerId, Subscription};
