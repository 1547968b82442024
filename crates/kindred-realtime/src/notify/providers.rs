//! Built-in presenter and push token source for headless clients

use async_trait::async_trait;
use kindred_core::{Notification, NotificationPresenter, PortResult, PushProvider};
use parking_lot::Mutex;

/// Presenter that writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPresenter;

#[async_trait]
impl NotificationPresenter for LogPresenter {
    async fn present(&self, notification: &Notification) -> PortResult<()> {
        tracing::info!(
            id = %notification.id,
            category = %notification.category,
            channel = notification.channel.id(),
            title = %notification.title,
            body = %notification.body,
            "Notification"
        );
        Ok(())
    }
}

/// Push provider backed by a token handed in at startup
#[derive(Debug)]
pub struct StaticPushProvider {
    token: Mutex<Option<String>>,
    platform: String,
}

impl StaticPushProvider {
    pub fn new(token: Option<String>, platform: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(token.filter(|t| !t.trim().is_empty())),
            platform: platform.into(),
        }
    }

    /// Provider for an install without push permission
    #[must_use]
    pub fn unavailable() -> Self {
        Self::new(None, "unknown")
    }
}

#[async_trait]
impl PushProvider for StaticPushProvider {
    async fn device_token(&self) -> PortResult<Option<String>> {
        Ok(self.token.lock().clone())
    }

    async fn revoke_token(&self, token: &str) -> PortResult<()> {
        let mut current = self.token.lock();
        if current.as_deref() == Some(token) {
            *current = None;
        }
        Ok(())
    }

    fn platform(&self) -> &str {
        &self.platform
    }
}
