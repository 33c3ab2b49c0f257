//! Upstream connection lifecycle: phases and reconnect backoff.

mod backoff;
mod state;

pub use backoff::ReconnectPolicy;
pub use state::{ConnectionPhase, ConnectionState, ReconnectDecision};
