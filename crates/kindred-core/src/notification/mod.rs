//! Notification model

mod notification;
mod settings;

pub use notification::{Notification, NotificationChannel, NotificationRoute};
pub use settings::{NotificationCategory, NotificationSettings, NotificationSettingsPatch};
