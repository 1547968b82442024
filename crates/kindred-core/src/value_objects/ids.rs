//! Opaque string identifiers
//!
//! The server hands out identifiers as opaque strings. Each kind gets its own newtype so a
//! conversation id can never be passed where a user id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the raw identifier
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume into the raw identifier
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

opaque_id!(
    /// Remote or local user identifier
    UserId
);
opaque_id!(
    /// Conversation (room) identifier
    ConversationId
);
opaque_id!(
    /// Chat message identifier
    MessageId
);
opaque_id!(
    /// Match identifier
    MatchId
);
opaque_id!(
    /// Identifier of a client install eligible for push notifications
    DeviceId
);

impl DeviceId {
    /// Derive the device identifier from a push capability token
    #[must_use]
    pub fn from_push_token(token: &str) -> Self {
        Self(format!("device_{token}"))
    }
}
