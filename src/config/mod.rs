//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `REALTIME_BRIDGE_` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use realtime_bridge::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Listening on {:?}", config.database.channel_list());
//! ```

mod bridge;
mod database;
mod error;
mod observability;

pub use bridge::{BridgeSettings, HeartbeatSettings, ReconnectSettings};
pub use database::{redact_url, DatabaseConfig};
pub use error::{ConfigError, ValidationError};
pub use observability::{LogFormat, ObservabilityConfig};

use serde::Deserialize;

/// Environment variable naming an optional configuration file.
pub const CONFIG_FILE_ENV: &str = "REALTIME_BRIDGE_CONFIG";

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads an optional file and then
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration (PostgreSQL connection and channels)
    pub database: DatabaseConfig,

    /// Bridge tuning (heartbeat, reconnect, capacity, health)
    #[serde(default)]
    pub bridge: BridgeSettings,

    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads the file named by `REALTIME_BRIDGE_CONFIG`, if set
    /// 3. Reads environment variables with `REALTIME_BRIDGE` prefix, which
    ///    override file values
    /// 4. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `REALTIME_BRIDGE__DATABASE__URL=...` -> `database.url = ...`
    /// - `REALTIME_BRIDGE__BRIDGE__HEARTBEAT__INTERVAL_MS=30000` -> `bridge.heartbeat.interval_ms`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required values are missing
    /// - Values cannot be parsed into expected types
    /// - The configuration file cannot be read
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let file = std::env::var(CONFIG_FILE_ENV).ok();
        Self::load_from(file.as_deref())
    }

    /// Load configuration from an explicit file (if any) plus environment.
    pub fn load_from(file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("REALTIME_BRIDGE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.bridge.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}
