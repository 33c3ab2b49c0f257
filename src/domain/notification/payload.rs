//! Inbound notifications and their decoded payloads.

use serde_json::{Map, Value};

use crate::domain::foundation::PayloadError;

/// One raw `(channel, payload)` pair delivered by the change source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub channel: String,
    pub payload: String,
}

impl Notification {
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// Decoded body of one notification.
///
/// Routing keys are lifted out of the object; the object itself is
/// forwarded to clients untouched, including fields this type does not
/// know about.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationPayload {
    /// `eventType` from the body, or the source channel when absent.
    pub event_type: String,
    pub device_id: Option<String>,
    pub user_id: Option<String>,
    pub body: Map<String, Value>,
}

impl NotificationPayload {
    /// Decodes a payload string received on `channel`.
    ///
    /// # Errors
    ///
    /// - `PayloadError::Empty` for an empty string
    /// - `PayloadError::InvalidJson` when the string does not parse
    /// - `PayloadError::NotAnObject` for any JSON value other than an object
    pub fn parse(channel: &str, raw: &str) -> Result<Self, PayloadError> {
        if raw.is_empty() {
            return Err(PayloadError::Empty);
        }

        let body = match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => map,
            other => return Err(PayloadError::NotAnObject(json_kind(&other))),
        };

        let event_type = body
            .get("eventType")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| channel.to_string());

        Ok(Self {
            event_type,
            device_id: routing_key(&body, "deviceId"),
            user_id: routing_key(&body, "userId"),
            body,
        })
    }

    /// Consumes the payload, returning the JSON object sent to clients.
    pub fn into_body(self) -> Value {
        Value::Object(self.body)
    }
}

/// Reads a routing key that may be encoded as a JSON string or number.
fn routing_key(body: &Map<String, Value>, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns at most `max_chars` characters of `raw` for log output.
pub fn truncate_sample(raw: &str, max_chars: usize) -> &str {
    match raw.char_indices().nth(max_chars) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_type_comes_from_body() {
        let payload =
            NotificationPayload::parse("changes", r#"{"eventType":"ping","deviceId":"dev-1"}"#)
                .unwrap();

        assert_eq!(payload.event_type, "ping");
        assert_eq!(payload.device_id.as_deref(), Some("dev-1"));
        assert_eq!(payload.user_id, None);
    }

    #[test]
    fn event_type_defaults_to_channel() {
        let payload = NotificationPayload::parse("user_changes", r#"{"userId":"u1"}"#).unwrap();

        assert_eq!(payload.event_type, "user_changes");
        assert_eq!(payload.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn numeric_routing_keys_are_stringified() {
        let payload = NotificationPayload::parse("c", r#"{"deviceId":42,"userId":7}"#).unwrap();

        assert_eq!(payload.device_id.as_deref(), Some("42"));
        assert_eq!(payload.user_id.as_deref(), Some("7"));
    }

    #[test]
    fn non_scalar_routing_keys_are_ignored() {
        let payload = NotificationPayload::parse("c", r#"{"deviceId":{"id":1}}"#).unwrap();
        assert_eq!(payload.device_id, None);
    }

    #[test]
    fn extra_fields_pass_through() {
        let payload =
            NotificationPayload::parse("c", r#"{"eventType":"x","extra":{"nested":[1,2]}}"#)
                .unwrap();

        assert_eq!(
            payload.into_body(),
            json!({"eventType": "x", "extra": {"nested": [1, 2]}})
        );
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert!(matches!(
            NotificationPayload::parse("c", ""),
            Err(PayloadError::Empty)
        ));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            NotificationPayload::parse("c", "{not json"),
            Err(PayloadError::InvalidJson(_))
        ));
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(matches!(
            NotificationPayload::parse("c", "[1,2,3]"),
            Err(PayloadError::NotAnObject("array"))
        ));
    }

    #[test]
    fn truncate_sample_respects_char_boundaries() {
        assert_eq!(truncate_sample("héllo wörld", 4), "héll");
        assert_eq!(truncate_sample("short", 100), "short");
    }
}
