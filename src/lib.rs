//! Realtime Bridge - PostgreSQL change notifications to server-sent events
//!
//! This crate subscribes to PostgreSQL `LISTEN`/`NOTIFY` channels and fans
//! every notification out to the long-lived client streams whose device or
//! user filter matches it, with supervised reconnection, heartbeats and
//! health reporting.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod observability;
pub mod ports;
