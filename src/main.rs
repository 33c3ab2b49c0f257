use std::sync::Arc;
use std::time::Duration;

use realtime_bridge::adapters::PgChangeSourceConnector;
use realtime_bridge::application::NotificationBridge;
use realtime_bridge::config::{redact_url, AppConfig, ConfigError};
use realtime_bridge::observability::init_tracing;

/// How often the binary logs a health summary.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), ConfigError> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.observability);

    tracing::info!(
        database = %redact_url(&config.database.url),
        channels = ?config.database.channel_list(),
        sse_buffer = config.bridge.sse_buffer,
        "Starting realtime bridge"
    );

    let connector = Arc::new(PgChangeSourceConnector::from_config(&config.database));
    let bridge = NotificationBridge::new(
        config.bridge.to_bridge_config(),
        connector,
        config.database.channel_list(),
    );

    match bridge.start().await {
        Ok(true) => {}
        Ok(false) => tracing::warn!("Initial connection failed; retrying in background"),
        Err(e) => tracing::error!(error = %e, "Bridge failed to start"),
    }

    let mut health_log = tokio::time::interval(HEALTH_LOG_INTERVAL);
    health_log.tick().await;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::error!(error = %e, "Failed to listen for shutdown signal");
                }
                break;
            }
            _ = health_log.tick() => {
                let stats = bridge.stats().await;
                tracing::info!(
                    connected = stats.health.is_connected,
                    healthy = stats.health.is_healthy,
                    clients = stats.clients.total,
                    events_processed = stats.counters.events_processed,
                    events_routed = stats.counters.events_routed,
                    "Bridge health"
                );
            }
        }
    }

    tracing::info!("Shutdown signal received");
    bridge.shutdown().await;
    Ok(())
}
