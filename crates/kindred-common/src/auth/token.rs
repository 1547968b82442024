//! Bearer token inspection
//!
//! The client never holds the signing key, so tokens are decoded without signature
//! verification. The claims are only used to pick the session user and to avoid
//! handshakes with a credential that has already expired.

use chrono::Utc;
use jsonwebtoken::{decode, DecodingKey, Validation};
use kindred_core::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Leeway applied to the expiry check, in seconds
const EXPIRY_LEEWAY_SECS: i64 = 30;

/// Claims the client reads from a bearer token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl TokenClaims {
    /// The user the token was issued for
    #[must_use]
    pub fn subject(&self) -> Option<UserId> {
        self.sub
            .as_deref()
            .or(self.user_id.as_deref())
            .or(self.id.as_deref())
            .map(UserId::from)
    }

    /// Check expiry against a unix timestamp
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp.is_some_and(|exp| now > exp + EXPIRY_LEEWAY_SECS)
    }

    /// Check expiry against the current time
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }
}

/// Token inspection errors
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(String),
}

/// Decode the claims of a JWT without verifying its signature
///
/// # Errors
/// Returns an error if the token is not a structurally valid JWT
pub fn inspect_token(token: &str) -> Result<TokenClaims, TokenError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| TokenError::Malformed(e.to_string()))
}
