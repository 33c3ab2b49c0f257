//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Channel '{0}' has no valid characters")]
    InvalidChannel(String),

    #[error("Invalid timeout: {0} must be positive")]
    InvalidTimeout(&'static str),

    #[error("Heartbeat interval must be positive")]
    InvalidHeartbeatInterval,

    #[error("max_clients must be positive")]
    InvalidMaxClients,

    #[error("Reconnect base delay must be positive and not exceed max delay")]
    InvalidReconnectDelays,

    #[error("bridge.sse_buffer must be positive")]
    InvalidSseBuffer,

    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),
}
