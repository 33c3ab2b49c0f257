//! Bridge tuning configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::DEFAULT_SSE_BUFFER;
use crate::application::{BridgeConfig, HeartbeatConfig};
use crate::domain::connection::ReconnectPolicy;

/// Heartbeat section (`bridge.heartbeat.*`)
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatSettings {
    /// Milliseconds between keepalive broadcasts
    #[serde(default = "default_heartbeat_interval")]
    pub interval_ms: u64,

    /// Embed server status in heartbeats
    #[serde(default = "default_true")]
    pub include_status: bool,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_heartbeat_interval(),
            include_status: true,
        }
    }
}

/// Reconnect section (`bridge.reconnect.*`)
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

/// Bridge configuration (`bridge.*`)
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeSettings {
    #[serde(default)]
    pub heartbeat: HeartbeatSettings,

    #[serde(default)]
    pub reconnect: ReconnectSettings,

    /// Maximum concurrently registered clients
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,

    /// Milliseconds without events before a connected bridge is unhealthy
    #[serde(default = "default_health_timeout")]
    pub health_timeout_ms: u64,

    /// Frames queued per SSE client before writes are rejected
    #[serde(default = "default_sse_buffer")]
    pub sse_buffer: usize,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            heartbeat: HeartbeatSettings::default(),
            reconnect: ReconnectSettings::default(),
            max_clients: default_max_clients(),
            health_timeout_ms: default_health_timeout(),
            sse_buffer: default_sse_buffer(),
        }
    }
}

impl BridgeSettings {
    /// Validate bridge configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.heartbeat.interval_ms == 0 {
            return Err(ValidationError::InvalidHeartbeatInterval);
        }
        if self.max_clients == 0 {
            return Err(ValidationError::InvalidMaxClients);
        }
        if self.reconnect.base_delay_ms == 0
            || self.reconnect.base_delay_ms > self.reconnect.max_delay_ms
        {
            return Err(ValidationError::InvalidReconnectDelays);
        }
        if self.health_timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout("bridge.health_timeout_ms"));
        }
        if self.sse_buffer == 0 {
            return Err(ValidationError::InvalidSseBuffer);
        }
        Ok(())
    }

    /// Runtime form consumed by `NotificationBridge`
    pub fn to_bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            heartbeat: HeartbeatConfig {
                interval: Duration::from_millis(self.heartbeat.interval_ms),
                include_status: self.heartbeat.include_status,
            },
            reconnect: ReconnectPolicy {
                base_delay: Duration::from_millis(self.reconnect.base_delay_ms),
                max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
                max_attempts: self.reconnect.max_attempts,
            },
            max_clients: self.max_clients,
            health_timeout: Duration::from_millis(self.health_timeout_ms),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_heartbeat_interval() -> u64 {
    60_000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_base_delay() -> u64 {
    1_000
}

fn default_max_delay() -> u64 {
    60_000
}

fn default_max_clients() -> usize {
    10_000
}

fn default_health_timeout() -> u64 {
    1_800_000
}

fn default_sse_buffer() -> usize {
    DEFAULT_SSE_BUFFER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_convert_to_default_bridge_config() {
        let settings = BridgeSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.to_bridge_config(), BridgeConfig::default());
    }

    #[test]
    fn test_zero_heartbeat_rejected() {
        let mut settings = BridgeSettings::default();
        settings.heartbeat.interval_ms = 0;
        assert!(matches!(
            settings.validate(),
            Err(ValidationError::InvalidHeartbeatInterval)
        ));
    }

    #[test]
    fn test_zero_max_clients_rejected() {
        let settings = BridgeSettings {
            max_clients: 0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(ValidationError::InvalidMaxClients)));
    }

    #[test]
    fn test_base_delay_above_max_rejected() {
        let mut settings = BridgeSettings::default();
        settings.reconnect.base_delay_ms = 120_000;
        assert!(matches!(
            settings.validate(),
            Err(ValidationError::InvalidReconnectDelays)
        ));
    }

    #[test]
    fn test_zero_health_timeout_rejected() {
        let settings = BridgeSettings {
            health_timeout_ms: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_sse_buffer_rejected() {
        let settings = BridgeSettings {
            sse_buffer: 0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(ValidationError::InvalidSseBuffer)));
    }

    #[test]
    fn test_conversion_uses_millis() {
        let mut settings = BridgeSettings::default();
        settings.reconnect.base_delay_ms = 250;
        settings.heartbeat.include_status = false;

        let config = settings.to_bridge_config();

        assert_eq!(config.reconnect.base_delay, Duration::from_millis(250));
        assert!(!config.heartbeat.include_status);
    }
}
