//! Credential provider reading the signed-in session from the key-value store

use async_trait::async_trait;
use kindred_common::inspect_token;
use kindred_core::{AuthProvider, KeyValueStore, PortResult, UserId};
use serde::Deserialize;
use std::sync::Arc;

use crate::store::keys;

/// Stored user profile; only the id is read
#[derive(Debug, Deserialize)]
struct StoredUser {
    #[serde(alias = "_id", alias = "userId")]
    id: UserId,
}

/// [`AuthProvider`] backed by the `token` and `user` keys of a store.
///
/// Tokens that decode as a JWT are checked for expiry. Opaque tokens pass through
/// unchanged and are judged by the server at handshake.
#[derive(Clone)]
pub struct StoredAuthProvider {
    store: Arc<dyn KeyValueStore>,
}

impl StoredAuthProvider {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist a session
    ///
    /// # Errors
    /// Returns an error if the store rejects the write
    pub async fn sign_in(&self, token: &str, user_id: &UserId) -> PortResult<()> {
        let user = serde_json::json!({ "id": user_id });
        self.store.set(keys::AUTH_TOKEN, token).await?;
        self.store.set(keys::AUTH_USER, &user.to_string()).await
    }

    /// Forget the stored session
    ///
    /// # Errors
    /// Returns an error if the store rejects the removal
    pub async fn sign_out(&self) -> PortResult<()> {
        self.store.remove(keys::AUTH_TOKEN).await?;
        self.store.remove(keys::AUTH_USER).await
    }

    async fn raw_token(&self) -> Option<String> {
        let raw = match self.store.get(keys::AUTH_TOKEN).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored credential");
                return None;
            }
        };
        // some hosts store the token JSON-encoded
        let token = raw.trim().trim_matches('"').to_string();
        (!token.is_empty()).then_some(token)
    }
}

#[async_trait]
impl AuthProvider for StoredAuthProvider {
    async fn credential(&self) -> Option<String> {
        let token = self.raw_token().await?;
        match inspect_token(&token) {
            Ok(claims) if claims.is_expired() => {
                tracing::debug!("Stored credential has expired");
                None
            }
            _ => Some(token),
        }
    }

    async fn current_user_id(&self) -> Option<UserId> {
        if let Ok(Some(raw)) = self.store.get(keys::AUTH_USER).await {
            match serde_json::from_str::<StoredUser>(&raw) {
                Ok(user) => return Some(user.id),
                Err(e) => tracing::debug!(error = %e, "Stored user record unreadable"),
            }
        }

        let token = self.raw_token().await?;
        inspect_token(&token).ok()?.subject()
    }
}
