//! Per-category notification settings

use serde::{Deserialize, Serialize};
use std::fmt;

/// Notification categories a user can toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Message,
    Like,
    Match,
}

impl NotificationCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Like => "like",
            Self::Match => "match",
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-configurable notification settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub messages: bool,
    pub likes: bool,
    pub matches: bool,
    pub sounds: bool,
    pub vibrations: bool,
    pub badge: bool,
    /// Show message text in the notification body
    pub preview: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            messages: true,
            likes: true,
            matches: true,
            sounds: true,
            vibrations: true,
            badge: true,
            preview: true,
        }
    }
}

impl NotificationSettings {
    /// Whether notifications of this category may be shown
    #[must_use]
    pub const fn is_enabled(&self, category: NotificationCategory) -> bool {
        match category {
            NotificationCategory::Message => self.messages,
            NotificationCategory::Like => self.likes,
            NotificationCategory::Match => self.matches,
        }
    }

    /// Apply a partial update
    pub fn apply(&mut self, patch: NotificationSettingsPatch) {
        if let Some(v) = patch.messages {
            self.messages = v;
        }
        if let Some(v) = patch.likes {
            self.likes = v;
        }
        if let Some(v) = patch.matches {
            self.matches = v;
        }
        if let Some(v) = patch.sounds {
            self.sounds = v;
        }
        if let Some(v) = patch.vibrations {
            self.vibrations = v;
        }
        if let Some(v) = patch.badge {
            self.badge = v;
        }
        if let Some(v) = patch.preview {
            self.preview = v;
        }
    }
}

/// Partial settings update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sounds: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibrations: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<bool>,
}
