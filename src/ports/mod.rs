//! Ports - Interfaces for external collaborators.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the bridge and the outside world. Adapters implement these ports.
//!
//! - `ChangeSource` / `ChangeSourceConnector` - the upstream
//!   publish/subscribe feed (PostgreSQL `LISTEN`/`NOTIFY` in production)
//! - `OutputSink` - one client's outbound server-sent-event stream

mod change_source;
mod output_sink;

pub use change_source::{ChangeSource, ChangeSourceConnector, ChangeSourceError};
pub use output_sink::{OutputSink, SinkError};
