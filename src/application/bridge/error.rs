//! Errors from bridge lifecycle operations.

/// Lifecycle misuse of a [`NotificationBridge`](super::NotificationBridge).
///
/// Transport and delivery failures never surface here; they are recovered
/// inside the bridge and reported through health and stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("Bridge is already started")]
    AlreadyStarted,

    #[error("Bridge has not been started")]
    NotStarted,

    #[error("Bridge supervisor has stopped")]
    SupervisorStopped,
}
