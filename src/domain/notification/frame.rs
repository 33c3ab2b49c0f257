//! Server-sent-event framing.
//!
//! Every message written to an output sink is one frame:
//!
//! ```text
//! event: <type>\n
//! data: <json>\n
//! \n
//! ```

use serde_json::{json, Value};

use crate::domain::foundation::Timestamp;

/// Name of the synthetic event sent right after registration.
pub const CONNECTED_EVENT: &str = "connected";

/// Name of the event sent before an administrative disconnect.
pub const DISCONNECTED_EVENT: &str = "disconnected";

/// Name of the periodic keepalive event.
pub const HEARTBEAT_EVENT: &str = "heartbeat";

/// One event addressed to a client stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SseFrame {
    event: String,
    data: Value,
}

impl SseFrame {
    /// Creates a frame. CR and LF are stripped from the event name so it
    /// cannot break the line-oriented framing.
    pub fn new(event: impl AsRef<str>, data: Value) -> Self {
        let event = event
            .as_ref()
            .chars()
            .filter(|c| *c != '\n' && *c != '\r')
            .collect();
        Self { event, data }
    }

    /// Confirmation frame carrying the registered client id.
    pub fn connected(client_id: &str, at: Timestamp) -> Self {
        Self::new(
            CONNECTED_EVENT,
            json!({
                "clientId": client_id,
                "timestamp": at.to_rfc3339(),
            }),
        )
    }

    /// Frame announcing a server-initiated disconnect.
    pub fn disconnected(reason: &str, at: Timestamp) -> Self {
        Self::new(
            DISCONNECTED_EVENT,
            json!({
                "reason": reason,
                "timestamp": at.to_rfc3339(),
            }),
        )
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Renders the frame in SSE wire format.
    ///
    /// `serde_json` never emits raw newlines, so the data always fits on
    /// a single `data:` line.
    pub fn render(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_produces_sse_wire_format() {
        let frame = SseFrame::new("ping", json!({"deviceId": "dev-1"}));
        assert_eq!(frame.render(), "event: ping\ndata: {\"deviceId\":\"dev-1\"}\n\n");
    }

    #[test]
    fn newlines_are_stripped_from_event_name() {
        let frame = SseFrame::new("evil\r\ndata: injected", json!({}));
        assert_eq!(frame.event(), "evildata: injected");
        assert_eq!(frame.render().matches('\n').count(), 3);
    }

    #[test]
    fn string_data_with_newlines_stays_on_one_line() {
        let frame = SseFrame::new("note", json!({"text": "line1\nline2"}));
        let rendered = frame.render();

        assert_eq!(rendered.matches('\n').count(), 3);
        assert!(rendered.contains(r#""line1\nline2""#));
    }

    #[test]
    fn connected_frame_carries_client_id() {
        let frame = SseFrame::connected("client-1", Timestamp::now());

        assert_eq!(frame.event(), CONNECTED_EVENT);
        assert_eq!(frame.data()["clientId"], "client-1");
        assert!(frame.data()["timestamp"].is_string());
    }

    #[test]
    fn disconnected_frame_carries_reason() {
        let frame = SseFrame::disconnected("Disconnected by administrator", Timestamp::now());

        assert_eq!(frame.event(), DISCONNECTED_EVENT);
        assert_eq!(frame.data()["reason"], "Disconnected by administrator");
    }
}
