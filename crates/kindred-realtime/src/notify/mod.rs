//! Local notifications and push device registration

mod gate;
mod payload;
mod providers;
mod registration;

#[cfg(test)]
pub(crate) mod fakes;

pub use gate::{GateDecision, NotificationGate, SuppressReason};
pub use payload::{preview_message, PREVIEW_LIMIT};
pub use providers::{LogPresenter, StaticPushProvider};
pub use registration::DeviceRegistrar;
