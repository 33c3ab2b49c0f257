//! In-memory table of live client streams.
//!
//! A client is present here exactly while its stream is considered open.
//! Removal is the only terminal transition; there is no soft-closed state.
//!
//! ```text
//! "client-a" → { device: dev-1, user: -,  sink }
//! "client-b" → { device: -,     user: u1, sink }
//! "client-c" → { device: -,     user: -,  sink }   (heartbeats only)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::client::{ClientBreakdown, ClientFilters, ClientInfo};
use crate::domain::foundation::Timestamp;
use crate::domain::notification::SseFrame;
use crate::ports::OutputSink;

/// One registered consumer. Owns its sink exclusively.
pub(crate) struct RegisteredClient {
    pub id: String,
    pub filters: ClientFilters,
    pub sink: Arc<dyn OutputSink>,
    pub connected_at: Timestamp,
    /// Distinguishes successive registrations that reuse the same id.
    pub registration: u64,
}

impl RegisteredClient {
    /// Writes a frame, swallowing failures.
    ///
    /// A failed write almost always means the remote already left; the
    /// sink's disconnect notification performs the cleanup.
    pub fn deliver(&self, frame: &SseFrame) -> bool {
        match self.sink.write(frame) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    client_id = %self.id,
                    event = %frame.event(),
                    "Failed to write to client sink: {}",
                    e
                );
                false
            }
        }
    }

    fn info(&self, now: Timestamp) -> ClientInfo {
        ClientInfo {
            id: self.id.clone(),
            device_filter: self.filters.device.clone(),
            user_filter: self.filters.user.clone(),
            connected_at: self.connected_at,
            duration_ms: u64::try_from(now.elapsed_since(&self.connected_at).as_millis())
                .unwrap_or(u64::MAX),
        }
    }
}

/// Registration was refused because the table is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CapacityExceeded {
    pub max_clients: usize,
}

/// Capacity-bounded map of client id to registered client.
pub(crate) struct ClientRegistry {
    clients: HashMap<String, RegisteredClient>,
    max_clients: usize,
}

impl ClientRegistry {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            max_clients,
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredClient> {
        self.clients.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredClient> {
        self.clients.values()
    }

    /// Inserts a client, returning the entry it replaced (same id).
    ///
    /// Replacing an existing id never counts against capacity.
    pub fn insert(
        &mut self,
        client: RegisteredClient,
    ) -> Result<Option<RegisteredClient>, CapacityExceeded> {
        if !self.clients.contains_key(&client.id) && self.clients.len() >= self.max_clients {
            return Err(CapacityExceeded {
                max_clients: self.max_clients,
            });
        }
        Ok(self.clients.insert(client.id.clone(), client))
    }

    /// Removes a client by id.
    pub fn remove(&mut self, id: &str) -> Option<RegisteredClient> {
        self.clients.remove(id)
    }

    /// Removes a client only if it is still the given registration.
    pub fn remove_registration(&mut self, id: &str, registration: u64) -> Option<RegisteredClient> {
        match self.clients.get(id) {
            Some(client) if client.registration == registration => self.clients.remove(id),
            _ => None,
        }
    }

    /// Empties the table, handing back every client.
    pub fn drain(&mut self) -> Vec<RegisteredClient> {
        self.clients.drain().map(|(_, client)| client).collect()
    }

    pub fn snapshot(&self, now: Timestamp) -> Vec<ClientInfo> {
        self.clients.values().map(|client| client.info(now)).collect()
    }

    pub fn breakdown(&self) -> ClientBreakdown {
        let mut breakdown = ClientBreakdown::default();
        for client in self.clients.values() {
            breakdown.record(client.filters.kind());
        }
        breakdown
    }

    /// Writes to every client whose device filter equals `device_id`.
    /// Returns the number of sinks attempted.
    pub fn broadcast_to_device(&self, device_id: &str, frame: &SseFrame) -> usize {
        self.broadcast_where(frame, |client| {
            client.filters.device.as_deref() == Some(device_id)
        })
    }

    /// Writes to every client whose user filter equals `user_id`.
    /// Returns the number of sinks attempted.
    pub fn broadcast_to_user(&self, user_id: &str, frame: &SseFrame) -> usize {
        self.broadcast_where(frame, |client| client.filters.user.as_deref() == Some(user_id))
    }

    /// Writes to every client. Returns the number of sinks attempted.
    pub fn broadcast_to_all(&self, frame: &SseFrame) -> usize {
        self.broadcast_where(frame, |_| true)
    }

    fn broadcast_where(
        &self,
        frame: &SseFrame,
        predicate: impl Fn(&RegisteredClient) -> bool,
    ) -> usize {
        let mut attempted = 0;
        for client in self.clients.values().filter(|client| predicate(*client)) {
            client.deliver(frame);
            attempted += 1;
        }
        attempted
    }
}
