//! Domain layer - pure values and state machines for the notification bridge.
//!
//! Nothing in here performs I/O; the application layer drives these types
//! and the adapters feed them.

pub mod client;
pub mod connection;
pub mod foundation;
pub mod notification;
pub mod stats;
