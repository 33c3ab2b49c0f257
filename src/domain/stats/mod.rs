//! Bridge counters and derived connection health.
//!
//! Counters only ever grow (except `current_connections`, which tracks the
//! live registry size); they reset only when the process restarts.

use serde::Serialize;
use std::time::Duration;

use crate::domain::client::ClientBreakdown;
use crate::domain::connection::ConnectionState;
use crate::domain::foundation::Timestamp;

/// Accumulated bridge counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStats {
    pub events_processed: u64,
    pub events_routed: u64,
    pub events_parse_failed: u64,
    pub events_dropped_no_clients: u64,
    pub reconnection_attempts: u64,
    pub total_connections: u64,
    pub current_connections: u64,
    pub last_event_received_at: Timestamp,
}

impl BridgeStats {
    /// Fresh counters. `last_event_received_at` starts at `started_at` so a
    /// newly connected bridge is healthy before its first event.
    pub fn new(started_at: Timestamp) -> Self {
        Self {
            events_processed: 0,
            events_routed: 0,
            events_parse_failed: 0,
            events_dropped_no_clients: 0,
            reconnection_attempts: 0,
            total_connections: 0,
            current_connections: 0,
            last_event_received_at: started_at,
        }
    }

    pub fn record_received(&mut self, at: Timestamp) {
        self.events_processed += 1;
        self.last_event_received_at = at;
    }

    pub fn record_connection_opened(&mut self) {
        self.total_connections += 1;
        self.current_connections += 1;
    }

    pub fn record_connection_closed(&mut self) {
        self.current_connections = self.current_connections.saturating_sub(1);
    }
}

/// Health view derived from the connection state and event recency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHealth {
    pub is_connected: bool,
    pub is_healthy: bool,
    pub is_reconnecting: bool,
    /// Retries ran out; only a forced reconnect will try again.
    pub is_exhausted: bool,
    pub reconnect_attempts: u32,
    pub channel_count: usize,
    pub last_event_received_at: Timestamp,
    pub ms_since_last_event: u64,
}

impl ConnectionHealth {
    /// Healthy means connected and an event arrived within `health_timeout`.
    pub fn evaluate(
        state: &ConnectionState,
        last_event_received_at: Timestamp,
        now: Timestamp,
        health_timeout: Duration,
        channel_count: usize,
    ) -> Self {
        let since_last_event = now.elapsed_since(&last_event_received_at);
        let is_connected = state.is_initialized();

        Self {
            is_connected,
            is_healthy: is_connected && since_last_event < health_timeout,
            is_reconnecting: state.is_reconnecting(),
            is_exhausted: state.is_exhausted(),
            reconnect_attempts: state.attempts(),
            channel_count,
            last_event_received_at,
            ms_since_last_event: u64::try_from(since_last_event.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Everything the admin surface shows about a bridge instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    #[serde(flatten)]
    pub counters: BridgeStats,
    pub clients: ClientBreakdown,
    pub health: ConnectionHealth,
}
