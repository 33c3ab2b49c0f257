//! In-memory adapters for tests.
//!
//! - `RecordingSink` - captures frames written to a client stream
//! - `ScriptedConnector` - fake change source driven from the test body

mod recording_sink;
mod scripted_source;

pub use recording_sink::RecordingSink;
pub use scripted_source::{ScriptedConnector, ScriptedSource};
