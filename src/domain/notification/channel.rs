//! Sanitized notification channel names.

use serde::{Serialize, Serializer};
use std::fmt;

/// A channel identifier restricted to `[A-Za-z0-9_]`.
///
/// Channel names are interpolated into `LISTEN`/`UNLISTEN` commands and
/// cannot be bound as parameters, so every other character is replaced
/// with `_` on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelName(String);

impl ChannelName {
    /// Sanitizes `raw` into a channel name.
    pub fn new(raw: &str) -> Self {
        Self(sanitize_channel(raw))
    }

    /// Returns the sanitized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelName {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ChannelName {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl Serialize for ChannelName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Replaces every character outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize_channel(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn keeps_safe_names_unchanged() {
        assert_eq!(ChannelName::new("device_events_2").as_str(), "device_events_2");
    }

    #[test]
    fn replaces_quotes_and_separators() {
        assert_eq!(
            ChannelName::new("user-events\"; DROP TABLE x;--").as_str(),
            "user_events___DROP_TABLE_x___"
        );
    }

    #[test]
    fn replaces_non_ascii_per_character() {
        assert_eq!(ChannelName::new("café").as_str(), "caf_");
    }

    #[test]
    fn display_matches_sanitized_name() {
        let channel: ChannelName = "a.b".into();
        assert_eq!(channel.to_string(), "a_b");
    }

    proptest! {
        #[test]
        fn sanitized_output_only_contains_safe_characters(raw in ".*") {
            let sanitized = sanitize_channel(&raw);
            prop_assert!(sanitized.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
            prop_assert_eq!(sanitized.chars().count(), raw.chars().count());
        }

        #[test]
        fn sanitizing_is_idempotent(raw in ".*") {
            let once = sanitize_channel(&raw);
            prop_assert_eq!(sanitize_channel(&once), once.clone());
        }
    }
}
