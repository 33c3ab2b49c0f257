//! OutputSink port - One client's outbound event stream.
//!
//! Supplied by the transport layer. The bridge writes framed events,
//! closes the sink on administrative disconnect, and relies on
//! [`OutputSink::disconnected`] as the authoritative signal that the
//! client is gone.

use futures::future::BoxFuture;

use crate::domain::notification::SseFrame;

/// Errors from writing to a sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The remote end or the sink itself is closed.
    #[error("Sink is closed")]
    Closed,

    /// The transport refused the frame.
    #[error("Sink rejected frame: {0}")]
    Rejected(String),
}

/// Outbound stream for a single client.
///
/// Writes are synchronous and must not block; a sink that cannot accept a
/// frame returns an error, which the bridge logs and otherwise ignores.
pub trait OutputSink: Send + Sync {
    /// Queue one frame for delivery.
    fn write(&self, frame: &SseFrame) -> Result<(), SinkError>;

    /// Close the stream. Must cause [`OutputSink::disconnected`] to resolve.
    fn close(&self);

    /// Resolves once the remote end has gone away or `close` was called.
    ///
    /// May be called once per registration; the returned future must not
    /// borrow the sink.
    fn disconnected(&self) -> BoxFuture<'static, ()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_sink_object_safe(_: &dyn OutputSink) {}

    #[test]
    fn sink_error_messages() {
        assert_eq!(SinkError::Closed.to_string(), "Sink is closed");
        assert_eq!(
            SinkError::Rejected("buffer full".to_string()).to_string(),
            "Sink rejected frame: buffer full"
        );
    }
}
