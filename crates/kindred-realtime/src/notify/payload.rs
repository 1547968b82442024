//! Notification content

use chrono::Utc;
use kindred_core::{
    ChatMessage, DeviceId, LikeEvent, MatchEvent, MessageType, NewMessageEvent, Notification,
    NotificationCategory, NotificationChannel, NotificationRoute, NotificationSettings,
};

/// Longest message text shown before truncation, in characters
pub const PREVIEW_LIMIT: usize = 120;

/// Body text for a chat message
#[must_use]
pub fn preview_message(message: &ChatMessage) -> String {
    match message.message_type {
        MessageType::Image => "Sent a photo".to_string(),
        MessageType::Video => "Sent a video".to_string(),
        MessageType::Audio => "Sent an audio message".to_string(),
        MessageType::Call => "Missed call".to_string(),
        MessageType::Text | MessageType::Other => {
            let content = message.content.trim();
            if content.is_empty() {
                "New message".to_string()
            } else if content.chars().count() > PREVIEW_LIMIT {
                let truncated: String = content.chars().take(PREVIEW_LIMIT).collect();
                format!("{truncated}...")
            } else {
                content.to_string()
            }
        }
    }
}

fn channel_for(category: NotificationCategory) -> NotificationChannel {
    match category {
        NotificationCategory::Message => NotificationChannel::Chat,
        NotificationCategory::Like | NotificationCategory::Match => NotificationChannel::Social,
    }
}

fn base(
    id: String,
    category: NotificationCategory,
    title: String,
    body: String,
    route: NotificationRoute,
    settings: &NotificationSettings,
    device_id: Option<DeviceId>,
) -> Notification {
    Notification {
        id,
        category,
        channel: channel_for(category),
        title,
        body,
        route,
        device_id,
        sound: settings.sounds,
        vibrate: settings.vibrations,
        badge: settings.badge.then_some(1),
        created_at: Utc::now(),
    }
}

pub(crate) fn message_notification(
    id: String,
    event: &NewMessageEvent,
    settings: &NotificationSettings,
    device_id: Option<DeviceId>,
) -> Notification {
    let sender = &event.message.sender_id;
    let title = sender.name().unwrap_or("New Message").to_string();
    let body = if settings.preview {
        preview_message(&event.message)
    } else {
        "New message".to_string()
    };
    let route = NotificationRoute::Chat {
        conversation_id: event.conversation_id.clone(),
        message_id: event.message.id.clone(),
        sender_id: sender.id().clone(),
        sender_name: sender.name().map(str::to_string),
        profile_picture: sender.profile_picture().map(str::to_string),
    };
    base(
        id,
        NotificationCategory::Message,
        title,
        body,
        route,
        settings,
        device_id,
    )
}

pub(crate) fn like_notification(
    id: String,
    event: &LikeEvent,
    settings: &NotificationSettings,
    device_id: Option<DeviceId>,
) -> Notification {
    let like = &event.like;
    let body = match like.user_name.as_deref() {
        Some(name) => format!("{name} liked your profile"),
        None => "Someone liked your profile".to_string(),
    };
    let route = NotificationRoute::Likes {
        user_id: like.user_id.clone(),
        match_id: like.match_id.clone(),
    };
    base(
        id,
        NotificationCategory::Like,
        "New Like!".to_string(),
        body,
        route,
        settings,
        device_id,
    )
}

pub(crate) fn match_notification(
    id: String,
    event: &MatchEvent,
    settings: &NotificationSettings,
    device_id: Option<DeviceId>,
) -> Notification {
    let info = &event.match_info;
    let body = match info.user_name.as_deref() {
        Some(name) => format!("You and {name} have matched! Start a conversation."),
        None => "You have a new match! Start a conversation.".to_string(),
    };
    let route = NotificationRoute::Match {
        match_id: info.match_id.clone(),
        user_id: info.user_id.clone(),
    };
    base(
        id,
        NotificationCategory::Match,
        "It's a Match!".to_string(),
        body,
        route,
        settings,
        device_id,
    )
}
