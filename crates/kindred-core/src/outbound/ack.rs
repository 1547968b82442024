//! Acknowledgement replies

use serde_json::Value;

/// Reply the server sends for an acknowledged emit.
///
/// Replies are loosely shaped: `{ success, data, error }` for most operations, a bare
/// object for queries. The accessors read whichever fields are present.
#[derive(Debug, Clone, PartialEq)]
pub struct AckResponse(Value);

impl AckResponse {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The `success` flag, if the reply has one
    #[must_use]
    pub fn success(&self) -> Option<bool> {
        self.0.get("success").and_then(Value::as_bool)
    }

    /// Whether the reply carries a non-null `error` field
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.0.get("error").is_some_and(|e| !e.is_null())
    }

    /// Error text reported by the server
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let error = self.0.get("error")?;
        match error {
            Value::Null => None,
            Value::String(message) => Some(message.clone()),
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| Some(error.to_string())),
            other => Some(other.to_string()),
        }
    }

    /// Explicit `success: true`
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success() == Some(true)
    }

    /// Explicit success, or no error reported
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.is_success() || (self.success().is_none() && !self.has_error())
    }

    /// The `data` field
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.0.get("data")
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for AckResponse {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_reply() {
        let ack = AckResponse::new(json!({ "success": true, "data": { "id": "m1" } }));
        assert!(ack.is_success());
        assert!(ack.is_accepted());
        assert_eq!(ack.data(), Some(&json!({ "id": "m1" })));
        assert_eq!(ack.error_message(), None);
    }

    #[test]
    fn test_failure_reply() {
        let ack = AckResponse::new(json!({ "success": false, "error": "blocked" }));
        assert!(!ack.is_success());
        assert!(!ack.is_accepted());
        assert_eq!(ack.error_message().as_deref(), Some("blocked"));
    }

    #[test]
    fn test_bare_reply_is_accepted() {
        let ack = AckResponse::new(json!({ "c1": 3 }));
        assert!(!ack.is_success());
        assert!(ack.is_accepted());
    }

    #[test]
    fn test_structured_error() {
        let ack = AckResponse::new(json!({ "error": { "message": "not a member" } }));
        assert!(!ack.is_accepted());
        assert_eq!(ack.error_message().as_deref(), Some("not a member"));
    }
}
