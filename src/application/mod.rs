//! Application layer - The bridge service.
//!
//! Orchestrates the domain values and ports: connection supervision,
//! client registry, event routing, heartbeat, health and stats.

pub mod bridge;

pub use bridge::{
    heartbeat_frame, BridgeConfig, BridgeError, HeartbeatConfig, NotificationBridge,
    RouteOutcome, ServerStatus, ADMIN_DISCONNECT_REASON,
};
