//! Test fixtures and payload builders
//!
//! Provides reusable server event payloads and registrations for integration tests.

use kindred_core::{DeviceId, DeviceRegistration};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// `new_message` payload from `sender` in conversation `c1`
pub fn new_message(sender: &str, message_id: &str) -> Value {
    json!({
        "conversationId": "c1",
        "message": {
            "_id": message_id,
            "sender": { "_id": sender, "name": format!("User {sender}") },
            "content": "Hey there",
            "messageType": "text"
        }
    })
}

/// `new_match` payload
pub fn new_match(match_id: &str, user_id: &str) -> Value {
    json!({
        "match": { "matchId": match_id, "userId": user_id, "userName": "Alex" }
    })
}

/// Device registration with a unique push token
pub fn registration() -> DeviceRegistration {
    let token = format!("push-token-{}", unique_suffix());
    DeviceRegistration {
        device_id: DeviceId::from_push_token(&token),
        push_token: token,
        platform: "android".to_string(),
        app_version: "1.0.0".to_string(),
        user_id: None,
        project_id: None,
    }
}
