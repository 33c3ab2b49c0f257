//! Periodic keepalive broadcast.
//!
//! The scheduler runs only while at least one client is registered: it
//! is started on the 0 → 1 transition and stopped on the transition back
//! to 0. The stored task handle guarantees at most one timer.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tokio::task::JoinHandle;

use crate::domain::foundation::Timestamp;
use crate::domain::notification::{SseFrame, HEARTBEAT_EVENT};

/// Server snapshot embedded in heartbeats when status is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub status: &'static str,
    /// Whole seconds since the bridge was constructed.
    pub uptime: u64,
    pub client_count: usize,
}

impl ServerStatus {
    pub fn new(initialized: bool, uptime: Duration, client_count: usize) -> Self {
        Self {
            status: if initialized { "healthy" } else { "degraded" },
            uptime: uptime.as_secs(),
            client_count,
        }
    }
}

/// Builds the keepalive frame.
pub fn heartbeat_frame(at: Timestamp, status: Option<ServerStatus>) -> SseFrame {
    let mut data = json!({ "timestamp": at.to_rfc3339() });
    if let Some(status) = status {
        data["server"] = json!(status);
    }
    SseFrame::new(HEARTBEAT_EVENT, data)
}

/// Owns the single heartbeat task, if any.
#[derive(Debug, Default)]
pub(crate) struct HeartbeatScheduler {
    handle: Option<JoinHandle<()>>,
    starts: u64,
}

impl HeartbeatScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Number of times a timer has been started over this scheduler's life.
    pub fn start_count(&self) -> u64 {
        self.starts
    }

    /// Spawns `ticker` unless a heartbeat task already exists.
    pub fn start<F>(&mut self, ticker: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.handle.is_some() {
            return false;
        }
        self.handle = Some(tokio::spawn(ticker));
        self.starts += 1;
        tracing::debug!("Heartbeat started");
        true
    }

    /// Cancels the heartbeat task, if any.
    pub fn stop(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                tracing::debug!("Heartbeat stopped");
                true
            }
            None => false,
        }
    }
}

impl Drop for HeartbeatScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_without_status_only_has_timestamp() {
        let frame = heartbeat_frame(Timestamp::now(), None);

        assert_eq!(frame.event(), HEARTBEAT_EVENT);
        assert!(frame.data()["timestamp"].is_string());
        assert!(frame.data().get("server").is_none());
    }

    #[test]
    fn frame_with_status_embeds_server_snapshot() {
        let status = ServerStatus::new(true, Duration::from_millis(125_900), 3);
        let frame = heartbeat_frame(Timestamp::now(), Some(status));

        assert_eq!(
            frame.data()["server"],
            json!({"status": "healthy", "uptime": 125, "clientCount": 3})
        );
    }

    #[test]
    fn degraded_when_not_initialized() {
        let status = ServerStatus::new(false, Duration::ZERO, 0);
        assert_eq!(status.status, "degraded");
    }

    #[tokio::test]
    async fn start_is_noop_while_running() {
        let mut scheduler = HeartbeatScheduler::new();

        assert!(scheduler.start(std::future::pending()));
        assert!(!scheduler.start(std::future::pending()));

        assert!(scheduler.is_running());
        assert_eq!(scheduler.start_count(), 1);
    }

    #[tokio::test]
    async fn stop_allows_restart() {
        let mut scheduler = HeartbeatScheduler::new();
        scheduler.start(std::future::pending());

        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        assert!(!scheduler.is_running());

        assert!(scheduler.start(std::future::pending()));
        assert_eq!(scheduler.start_count(), 2);
    }
}
