//! Notification gate
//!
//! Decides whether an inbound event becomes a user-visible notification. Checks run in
//! a fixed order and stop at the first that fails:
//!
//! 1. this device is registered for push delivery
//! 2. the event was not caused by the signed-in user
//! 3. the category is enabled in the user's settings
//! 4. the same logical event was not surfaced before

use kindred_cache::{keys, DedupKey, DedupRecord};
use kindred_common::NotificationConfig;
use kindred_core::{
    KeyValueStore, Notification, NotificationCategory, NotificationPresenter,
    NotificationSettings, NotificationSettingsPatch, PortResult, ServerEvent, UserId,
};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::payload::{like_notification, match_notification, message_notification};
use super::registration::DeviceRegistrar;

/// Why an event produced no notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuppressReason {
    /// Not a message, like or match
    NotNotifiable,
    DeviceNotRegistered,
    SelfOriginated,
    CategoryDisabled,
    AlreadyDelivered,
}

impl SuppressReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotNotifiable => "not_notifiable",
            Self::DeviceNotRegistered => "device_not_registered",
            Self::SelfOriginated => "self_originated",
            Self::CategoryDisabled => "category_disabled",
            Self::AlreadyDelivered => "already_delivered",
        }
    }
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Present(Notification),
    Suppress(SuppressReason),
}

impl GateDecision {
    #[must_use]
    pub fn is_presented(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

/// Category and dedup key of a notifiable event; likes without an identity have no key
fn classify(event: &ServerEvent) -> Option<(NotificationCategory, Option<String>)> {
    match event {
        ServerEvent::NewMessage(e) => Some((
            NotificationCategory::Message,
            Some(DedupKey::message(&e.conversation_id, &e.message.id)),
        )),
        ServerEvent::NewLike(e) => Some((
            NotificationCategory::Like,
            DedupKey::like(
                &e.like.user_id,
                e.like.match_id.as_ref(),
                e.like.event_identity().as_deref(),
            ),
        )),
        ServerEvent::NewMatch(e) => Some((
            NotificationCategory::Match,
            Some(DedupKey::match_(&e.match_info.match_id)),
        )),
        _ => None,
    }
}

pub struct NotificationGate {
    registrar: Arc<DeviceRegistrar>,
    presenter: Arc<dyn NotificationPresenter>,
    store: Arc<dyn KeyValueStore>,
    current_user: RwLock<Option<UserId>>,
    settings: RwLock<NotificationSettings>,
    dedup: Mutex<DedupRecord>,
    history: Mutex<VecDeque<Notification>>,
    history_limit: usize,
    /// Suffix for ids of notifications that have no dedup key
    undeduplicated: AtomicU64,
}

impl fmt::Debug for NotificationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationGate")
            .field("current_user", &*self.current_user.read())
            .field("settings", &*self.settings.read())
            .field("delivered", &self.dedup.lock().len())
            .finish_non_exhaustive()
    }
}

impl NotificationGate {
    /// Build the gate, restoring persisted notification settings.
    ///
    /// Unreadable or corrupt settings fall back to the defaults.
    pub async fn load(
        registrar: Arc<DeviceRegistrar>,
        presenter: Arc<dyn NotificationPresenter>,
        store: Arc<dyn KeyValueStore>,
        config: &NotificationConfig,
    ) -> Self {
        let settings = match store.get(keys::NOTIFICATION_SETTINGS).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Discarding corrupt notification settings");
                NotificationSettings::default()
            }),
            Ok(None) => NotificationSettings::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read notification settings");
                NotificationSettings::default()
            }
        };

        Self {
            registrar,
            presenter,
            store,
            current_user: RwLock::new(None),
            settings: RwLock::new(settings),
            dedup: Mutex::new(DedupRecord::new(
                config.dedup_capacity,
                config.dedup_evict_batch,
            )),
            history: Mutex::new(VecDeque::new()),
            history_limit: config.history_limit,
            undeduplicated: AtomicU64::new(0),
        }
    }

    pub fn set_current_user(&self, user_id: Option<UserId>) {
        *self.current_user.write() = user_id;
    }

    #[must_use]
    pub fn current_user(&self) -> Option<UserId> {
        self.current_user.read().clone()
    }

    #[must_use]
    pub fn settings(&self) -> NotificationSettings {
        *self.settings.read()
    }

    /// Apply a partial settings change and persist the result
    ///
    /// # Errors
    /// Returns an error if the settings cannot be stored; the change still applies
    /// for this session
    pub async fn update_settings(
        &self,
        patch: NotificationSettingsPatch,
    ) -> PortResult<NotificationSettings> {
        let updated = {
            let mut settings = self.settings.write();
            settings.apply(patch);
            *settings
        };
        let raw = serde_json::to_string(&updated)?;
        self.store.set(keys::NOTIFICATION_SETTINGS, &raw).await?;
        Ok(updated)
    }

    /// Run the checks; on success the dedup key is recorded
    pub fn evaluate(&self, event: &ServerEvent) -> GateDecision {
        let Some((category, key)) = classify(event) else {
            return GateDecision::Suppress(SuppressReason::NotNotifiable);
        };

        if !self.registrar.is_device_registered() {
            return GateDecision::Suppress(SuppressReason::DeviceNotRegistered);
        }

        let current_user = self.current_user.read().clone();
        if current_user.is_some() && event.actor_id() == current_user.as_ref() {
            return GateDecision::Suppress(SuppressReason::SelfOriginated);
        }

        let settings = self.settings();
        if !settings.is_enabled(category) {
            return GateDecision::Suppress(SuppressReason::CategoryDisabled);
        }

        let key = match key {
            Some(key) => {
                if !self.dedup.lock().check_and_insert(key.clone()) {
                    return GateDecision::Suppress(SuppressReason::AlreadyDelivered);
                }
                key
            }
            None => self.unique_id(event),
        };

        let device_id = self.registrar.current_device_id();
        let notification = match event {
            ServerEvent::NewMessage(e) => message_notification(key, e, &settings, device_id),
            ServerEvent::NewLike(e) => like_notification(key, e, &settings, device_id),
            ServerEvent::NewMatch(e) => match_notification(key, e, &settings, device_id),
            _ => return GateDecision::Suppress(SuppressReason::NotNotifiable),
        };
        GateDecision::Present(notification)
    }

    /// Notification id for an event that cannot be deduplicated
    fn unique_id(&self, event: &ServerEvent) -> String {
        let actor = event.actor_id().map_or("-", UserId::as_str);
        let seq = self.undeduplicated.fetch_add(1, Ordering::Relaxed);
        format!("like:{actor}:{}-{seq}", Utc::now().timestamp_millis())
    }

    /// Evaluate and, on success, present in the background
    pub fn handle(&self, event: &ServerEvent) -> GateDecision {
        let decision = self.evaluate(event);
        match &decision {
            GateDecision::Present(notification) => {
                self.remember(notification.clone());
                let presenter = self.presenter.clone();
                let notification = notification.clone();
                tokio::spawn(async move {
                    if let Err(e) = presenter.present(&notification).await {
                        warn!(id = %notification.id, error = %e, "Failed to present notification");
                    }
                });
            }
            GateDecision::Suppress(reason) => {
                debug!(event = %event.kind(), reason = %reason, "Notification suppressed");
            }
        }
        decision
    }

    /// Mark an event as already surfaced, e.g. a message this client sent itself.
    ///
    /// Returns `false` if the key was known.
    pub fn record_delivered(&self, key: impl Into<String>) -> bool {
        self.dedup.lock().check_and_insert(key)
    }

    fn remember(&self, notification: Notification) {
        let mut history = self.history.lock();
        history.push_back(notification);
        while history.len() > self.history_limit {
            history.pop_front();
        }
    }

    /// Presented notifications, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<Notification> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    #[must_use]
    pub fn registrar(&self) -> &Arc<DeviceRegistrar> {
        &self.registrar
    }
}
