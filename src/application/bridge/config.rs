//! Runtime tuning for a bridge instance.

use std::time::Duration;

use crate::domain::connection::ReconnectPolicy;

/// Heartbeat behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Time between keepalive broadcasts.
    ///
    /// Default: 60 seconds
    pub interval: Duration,

    /// Embed a server status snapshot in each heartbeat.
    ///
    /// Default: true
    pub include_status: bool,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(60_000),
            include_status: true,
        }
    }
}

/// Configuration for a [`NotificationBridge`](super::NotificationBridge).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub heartbeat: HeartbeatConfig,
    pub reconnect: ReconnectPolicy,

    /// Registrations beyond this are refused.
    ///
    /// Default: 10000
    pub max_clients: usize,

    /// Connected bridges with no event for this long report unhealthy.
    ///
    /// Default: 30 minutes
    pub health_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            heartbeat: HeartbeatConfig::default(),
            reconnect: ReconnectPolicy::default(),
            max_clients: 10_000,
            health_timeout: Duration::from_millis(1_800_000),
        }
    }
}

impl BridgeConfig {
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat.interval = interval;
        self
    }

    pub fn with_heartbeat_status(mut self, include_status: bool) -> Self {
        self.heartbeat.include_status = include_status;
        self
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }
}
