//! Event routing: one inbound notification to zero or more client frames.
//!
//! # Flow
//!
//! ```text
//! (channel, payload)
//!        │  events_processed += 1, last_event_received_at = now
//!        ▼
//!   empty? ──────────────► stop
//!        │
//!   parse JSON ── fail ──► events_parse_failed += 1, stop
//!        │
//!   match clients (device filter first, then user filter)
//!        │
//!   none? ───────────────► events_dropped_no_clients += 1, stop
//!        │
//!   write frame to each match; events_routed += successful writes
//! ```

use crate::domain::foundation::{PayloadError, Timestamp};
use crate::domain::notification::{truncate_sample, Notification, NotificationPayload, SseFrame};
use crate::domain::stats::BridgeStats;

use super::registry::ClientRegistry;

/// Characters of a bad payload kept in the log line.
const PAYLOAD_SAMPLE_CHARS: usize = 200;

/// What happened to one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Empty payload; nothing to do.
    Empty,
    /// Payload did not decode.
    ParseFailed,
    /// Decoded, but no client filter matched.
    DroppedNoClients,
    /// Written to `delivered` of `matched` clients.
    Routed { matched: usize, delivered: usize },
}

/// Routes one notification against the registry, updating `stats`.
///
/// Never fails: decode and delivery problems are counted and logged.
pub(crate) fn route(
    notification: &Notification,
    registry: &ClientRegistry,
    stats: &mut BridgeStats,
    now: Timestamp,
) -> RouteOutcome {
    stats.record_received(now);

    let payload = match NotificationPayload::parse(&notification.channel, &notification.payload) {
        Ok(payload) => payload,
        Err(PayloadError::Empty) => return RouteOutcome::Empty,
        Err(e) => {
            stats.events_parse_failed += 1;
            tracing::warn!(
                channel = %notification.channel,
                sample = %truncate_sample(&notification.payload, PAYLOAD_SAMPLE_CHARS),
                "Failed to parse notification payload: {}",
                e
            );
            return RouteOutcome::ParseFailed;
        }
    };

    let matches: Vec<_> = registry
        .iter()
        .filter(|client| client.filters.matches(&payload).is_some())
        .collect();

    if matches.is_empty() {
        stats.events_dropped_no_clients += 1;
        tracing::trace!(
            channel = %notification.channel,
            event_type = %payload.event_type,
            "No clients matched notification"
        );
        return RouteOutcome::DroppedNoClients;
    }

    let event_type = payload.event_type.clone();
    let frame = SseFrame::new(&event_type, payload.into_body());
    let mut delivered = 0;
    for client in &matches {
        if client.deliver(&frame) {
            delivered += 1;
        }
    }
    stats.events_routed += delivered as u64;

    tracing::trace!(
        event_type = %event_type,
        matched = matches.len(),
        delivered,
        "Routed notification"
    );

    RouteOutcome::Routed {
        matched: matches.len(),
        delivered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::RecordingSink;
    use crate::application::bridge::registry::RegisteredClient;
    use crate::domain::client::ClientFilters;
    use std::sync::Arc;

    fn registry_with(clients: &[(&str, ClientFilters)]) -> (ClientRegistry, Vec<Arc<RecordingSink>>) {
        let mut registry = ClientRegistry::new(100);
        let mut sinks = Vec::new();
        for (i, (id, filters)) in clients.iter().enumerate() {
            let sink = Arc::new(RecordingSink::new());
            registry
                .insert(RegisteredClient {
                    id: id.to_string(),
                    filters: filters.clone(),
                    sink: sink.clone(),
                    connected_at: Timestamp::now(),
                    registration: i as u64,
                })
                .unwrap();
            sinks.push(sink);
        }
        (registry, sinks)
    }

    fn stats() -> BridgeStats {
        BridgeStats::new(Timestamp::now())
    }

    #[test]
    fn routes_device_event_to_matching_client() {
        let (registry, sinks) = registry_with(&[("a", ClientFilters::device("dev-1"))]);
        let mut stats = stats();

        let outcome = route(
            &Notification::new("c", r#"{"eventType":"ping","deviceId":"dev-1"}"#),
            &registry,
            &mut stats,
            Timestamp::now(),
        );

        assert_eq!(outcome, RouteOutcome::Routed { matched: 1, delivered: 1 });
        assert_eq!(sinks[0].events(), vec!["ping"]);
        assert_eq!(stats.events_processed, 1);
        assert_eq!(stats.events_routed, 1);
        assert_eq!(stats.events_dropped_no_clients, 0);
    }

    #[test]
    fn client_with_both_filters_receives_once() {
        let (registry, sinks) =
            registry_with(&[("a", ClientFilters::device("d1").with_user("u1"))]);
        let mut stats = stats();

        route(
            &Notification::new("c", r#"{"deviceId":"d1","userId":"u2"}"#),
            &registry,
            &mut stats,
            Timestamp::now(),
        );

        assert_eq!(sinks[0].frames().len(), 1);
        assert_eq!(stats.events_routed, 1);
    }

    #[test]
    fn frame_uses_channel_when_event_type_missing() {
        let (registry, sinks) = registry_with(&[("a", ClientFilters::user("u1"))]);
        let mut stats = stats();

        route(
            &Notification::new("user_changes", r#"{"userId":"u1","plan":"pro"}"#),
            &registry,
            &mut stats,
            Timestamp::now(),
        );

        let frames = sinks[0].frames();
        assert_eq!(frames[0].event(), "user_changes");
        assert_eq!(frames[0].data()["plan"], "pro");
    }

    #[test]
    fn malformed_payload_only_counts_parse_failure() {
        let (registry, sinks) = registry_with(&[("a", ClientFilters::device("d1"))]);
        let mut stats = stats();

        let outcome = route(
            &Notification::new("c", "{not json"),
            &registry,
            &mut stats,
            Timestamp::now(),
        );

        assert_eq!(outcome, RouteOutcome::ParseFailed);
        assert_eq!(stats.events_parse_failed, 1);
        assert_eq!(stats.events_routed, 0);
        assert_eq!(stats.events_dropped_no_clients, 0);
        assert!(sinks[0].frames().is_empty());
    }

    #[test]
    fn empty_payload_only_counts_processed() {
        let (registry, _) = registry_with(&[]);
        let mut stats = stats();

        let outcome = route(&Notification::new("c", ""), &registry, &mut stats, Timestamp::now());

        assert_eq!(outcome, RouteOutcome::Empty);
        assert_eq!(stats.events_processed, 1);
        assert_eq!(stats.events_parse_failed, 0);
        assert_eq!(stats.events_dropped_no_clients, 0);
    }

    #[test]
    fn no_clients_counts_drop() {
        let (registry, _) = registry_with(&[]);
        let mut stats = stats();

        let outcome = route(
            &Notification::new("c", r#"{"deviceId":"d1"}"#),
            &registry,
            &mut stats,
            Timestamp::now(),
        );

        assert_eq!(outcome, RouteOutcome::DroppedNoClients);
        assert_eq!(stats.events_dropped_no_clients, 1);
    }

    #[test]
    fn unmatched_filters_count_drop() {
        let (registry, sinks) = registry_with(&[("a", ClientFilters::device("d2"))]);
        let mut stats = stats();

        route(
            &Notification::new("c", r#"{"deviceId":"d1"}"#),
            &registry,
            &mut stats,
            Timestamp::now(),
        );

        assert_eq!(stats.events_dropped_no_clients, 1);
        assert!(sinks[0].frames().is_empty());
    }

    #[test]
    fn write_failure_does_not_stop_other_deliveries() {
        let (registry, sinks) = registry_with(&[
            ("a", ClientFilters::device("d1")),
            ("b", ClientFilters::device("d1")),
        ]);
        sinks[0].fail_writes();
        let mut stats = stats();

        let outcome = route(
            &Notification::new("c", r#"{"deviceId":"d1"}"#),
            &registry,
            &mut stats,
            Timestamp::now(),
        );

        assert_eq!(outcome, RouteOutcome::Routed { matched: 2, delivered: 1 });
        assert_eq!(sinks[1].frames().len(), 1);
        assert_eq!(stats.events_routed, 1);
    }

    #[test]
    fn updates_last_event_timestamp() {
        let (registry, _) = registry_with(&[]);
        let mut stats = stats();
        let now = Timestamp::now();

        route(&Notification::new("c", "{}"), &registry, &mut stats, now);

        assert_eq!(stats.last_event_received_at, now);
    }
}
