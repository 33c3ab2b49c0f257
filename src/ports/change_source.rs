//! ChangeSource port - Interface for the upstream change-notification feed.
//!
//! The bridge holds exactly one live source at a time. The connector opens
//! fresh handles; the supervisor owns the handle it got and is the only
//! code that touches it.
//!
//! ## Lifecycle
//!
//! ```text
//! connector.connect() ──► source.listen(ch) for every channel
//!                              │
//!                              ▼
//!                    loop { source.recv() }  ── Err ──► close, back off, reconnect
//!                              │
//!                           shutdown ──► unlisten(ch)..., close()
//! ```

use async_trait::async_trait;

use crate::domain::notification::{ChannelName, Notification};

/// Errors reported by a change source.
///
/// None of these are fatal to the process; the supervisor degrades and
/// retries.
#[derive(Debug, thiserror::Error)]
pub enum ChangeSourceError {
    #[error("Failed to connect to change source: {0}")]
    Connect(String),

    #[error("Failed to listen on channel '{channel}': {reason}")]
    Listen { channel: String, reason: String },

    #[error("Failed to unlisten channel '{channel}': {reason}")]
    Unlisten { channel: String, reason: String },

    #[error("Failed to receive notification: {0}")]
    Receive(String),

    #[error("Connection to change source lost")]
    ConnectionLost,

    #[error("Failed to close change source: {0}")]
    Close(String),
}

/// One open subscription handle to the upstream feed.
///
/// `recv` merges what callback-style drivers expose as separate message
/// and error hooks: `Ok` is the next notification in delivery order,
/// `Err` is an asynchronous failure of the handle.
#[async_trait]
pub trait ChangeSource: Send {
    /// Subscribe to a channel.
    async fn listen(&mut self, channel: &ChannelName) -> Result<(), ChangeSourceError>;

    /// Unsubscribe from a channel.
    async fn unlisten(&mut self, channel: &ChannelName) -> Result<(), ChangeSourceError>;

    /// Wait for the next notification.
    ///
    /// Must be cancel-safe: the supervisor drops this future when a
    /// command arrives.
    async fn recv(&mut self) -> Result<Notification, ChangeSourceError>;

    /// Release the handle.
    async fn close(self: Box<Self>) -> Result<(), ChangeSourceError>;
}

/// Opens new change-source handles.
#[async_trait]
pub trait ChangeSourceConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ChangeSource>, ChangeSourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that traits are object-safe
    #[allow(dead_code)]
    fn assert_source_object_safe(_: &dyn ChangeSource) {}

    #[allow(dead_code)]
    fn assert_connector_object_safe(_: &dyn ChangeSourceConnector) {}

    #[test]
    fn listen_error_names_channel() {
        let err = ChangeSourceError::Listen {
            channel: "device_events".to_string(),
            reason: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to listen on channel 'device_events': permission denied"
        );
    }
}
