//! Foundation module - Shared domain primitives.
//!
//! Contains value objects and error types that form the vocabulary
//! of the notification bridge.

mod errors;
mod timestamp;

pub use errors::PayloadError;
pub use timestamp::Timestamp;
