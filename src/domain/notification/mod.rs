//! Notification values: channels, inbound payloads and outbound frames.

mod channel;
mod frame;
mod payload;

pub use channel::{sanitize_channel, ChannelName};
pub use frame::{SseFrame, CONNECTED_EVENT, DISCONNECTED_EVENT, HEARTBEAT_EVENT};
pub use payload::{truncate_sample, Notification, NotificationPayload};
