//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the bridge to external systems:
//! - `postgres` - `LISTEN`/`NOTIFY` change source
//! - `sse` - server-sent-event output sink for `axum` responses
//! - `memory` - scripted change source and recording sink for tests

pub mod memory;
pub mod postgres;
pub mod sse;

pub use memory::{RecordingSink, ScriptedConnector, ScriptedSource};
pub use postgres::{PgChangeSource, PgChangeSourceConnector};
pub use sse::{sse_channel, SseSink, SseStream, DEFAULT_SSE_BUFFER};
