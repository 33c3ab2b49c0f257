//! NotificationBridge - Fans upstream change notifications out to client streams.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────┐   recv()   ┌──────────────┐   route()   ┌───────────────┐
//! │ ChangeSource       │ ─────────► │  Supervisor  │ ──────────► │ ClientRegistry│
//! │ (LISTEN/NOTIFY)    │            │  (one task)  │             │  + Heartbeat  │
//! └────────────────────┘            └──────────────┘             └───────┬───────┘
//!                                                                        │ write()
//!                                                                        ▼
//!                                                                  OutputSink × N
//! ```
//!
//! The registry and heartbeat live behind one `RwLock` so that
//! register/unregister are atomic with respect to routing and heartbeat
//! iteration. Lock order is hub, then stats; connection state is only ever
//! held on its own.

mod config;
mod error;
mod heartbeat;
mod registry;
mod router;
mod supervisor;

pub use config::{BridgeConfig, HeartbeatConfig};
pub use error::BridgeError;
pub use heartbeat::{heartbeat_frame, ServerStatus};
pub use router::RouteOutcome;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::domain::client::{ClientFilters, ClientInfo};
use crate::domain::connection::{ConnectionPhase, ConnectionState};
use crate::domain::foundation::Timestamp;
use crate::domain::notification::{ChannelName, Notification, SseFrame};
use crate::domain::stats::{BridgeStats, ConnectionHealth, StatsSnapshot};
use crate::ports::{ChangeSourceConnector, OutputSink};

use heartbeat::HeartbeatScheduler;
use registry::{CapacityExceeded, ClientRegistry, RegisteredClient};
use supervisor::{SupervisorCommand, SupervisorHandle};

/// Reason sent to clients removed through [`NotificationBridge::disconnect_client`].
pub const ADMIN_DISCONNECT_REASON: &str = "Disconnected by administrator";

struct ClientHub {
    registry: ClientRegistry,
    heartbeat: HeartbeatScheduler,
    /// Set once by shutdown; registration checks it under the write lock.
    closed: bool,
}

impl ClientHub {
    /// Refuses further registrations and hands back every current client.
    fn close(&mut self) -> Vec<RegisteredClient> {
        self.closed = true;
        self.heartbeat.stop();
        self.registry.drain()
    }
}

/// State shared between the bridge handle, the supervisor task, the
/// heartbeat task and per-client disconnect watchers.
pub(crate) struct BridgeShared {
    config: BridgeConfig,
    channels: Vec<ChannelName>,
    connector: Arc<dyn ChangeSourceConnector>,
    started_at: Timestamp,
    hub: RwLock<ClientHub>,
    stats: Mutex<BridgeStats>,
    connection: RwLock<ConnectionState>,
    next_registration: AtomicU64,
}

impl BridgeShared {
    async fn route(&self, notification: &Notification) -> RouteOutcome {
        let hub = self.hub.read().await;
        let mut stats = self.stats.lock().await;
        router::route(notification, &hub.registry, &mut stats, Timestamp::now())
    }

    async fn remove_client<F>(&self, removal: F) -> bool
    where
        F: FnOnce(&mut ClientRegistry) -> Option<RegisteredClient>,
    {
        let mut hub = self.hub.write().await;
        let Some(client) = removal(&mut hub.registry) else {
            return false;
        };

        self.stats.lock().await.record_connection_closed();
        if hub.registry.is_empty() {
            hub.heartbeat.stop();
        }

        tracing::info!(
            client_id = %client.id,
            remaining = hub.registry.len(),
            "Client unregistered"
        );
        true
    }

    async fn send_heartbeat(&self) -> usize {
        let hub = self.hub.read().await;
        if hub.registry.is_empty() {
            return 0;
        }

        let now = Timestamp::now();
        let status = if self.config.heartbeat.include_status {
            let initialized = self.connection.read().await.is_initialized();
            Some(ServerStatus::new(
                initialized,
                now.elapsed_since(&self.started_at),
                hub.registry.len(),
            ))
        } else {
            None
        };

        let sent = hub.registry.broadcast_to_all(&heartbeat_frame(now, status));
        tracing::trace!(clients = sent, "Heartbeat sent");
        sent
    }
}

async fn run_heartbeat(shared: Weak<BridgeShared>, interval: Duration) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(shared) = shared.upgrade() else {
            return;
        };
        shared.send_heartbeat().await;
    }
}

enum SupervisorSlot {
    NotStarted,
    Running(SupervisorHandle),
    Stopped,
}

/// Realtime notification bridge.
///
/// Cheap to clone; clones share one registry, one stats record and one
/// supervisor. Dropping every clone stops the supervisor.
#[derive(Clone)]
pub struct NotificationBridge {
    shared: Arc<BridgeShared>,
    supervisor: Arc<Mutex<SupervisorSlot>>,
}

impl NotificationBridge {
    /// Creates a bridge. Nothing connects until [`start`](Self::start).
    ///
    /// Channel names are sanitized to `[A-Za-z0-9_]`; names that sanitize
    /// to nothing are skipped.
    pub fn new<I, S>(config: BridgeConfig, connector: Arc<dyn ChangeSourceConnector>, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = Vec::new();
        for raw in channels {
            let name = ChannelName::new(raw.as_ref());
            if name.as_str().is_empty() {
                tracing::warn!(channel = raw.as_ref(), "Skipping channel with no valid characters");
                continue;
            }
            if !names.contains(&name) {
                names.push(name);
            }
        }

        let started_at = Timestamp::now();
        let shared = BridgeShared {
            hub: RwLock::new(ClientHub {
                registry: ClientRegistry::new(config.max_clients),
                heartbeat: HeartbeatScheduler::new(),
                closed: false,
            }),
            stats: Mutex::new(BridgeStats::new(started_at)),
            connection: RwLock::new(ConnectionState::new()),
            next_registration: AtomicU64::new(1),
            config,
            channels: names,
            connector,
            started_at,
        };

        Self {
            shared: Arc::new(shared),
            supervisor: Arc::new(Mutex::new(SupervisorSlot::NotStarted)),
        }
    }

    /// Spawns the connection supervisor and waits for the first connect
    /// attempt. Returns whether it succeeded; on failure the supervisor
    /// keeps retrying in the background.
    pub async fn start(&self) -> Result<bool, BridgeError> {
        let mut slot = self.supervisor.lock().await;
        match *slot {
            SupervisorSlot::Running(_) => return Err(BridgeError::AlreadyStarted),
            SupervisorSlot::Stopped => return Err(BridgeError::SupervisorStopped),
            SupervisorSlot::NotStarted => {}
        }

        tracing::info!(
            channels = ?self.channel_names(),
            max_clients = self.shared.config.max_clients,
            "Starting notification bridge"
        );

        let (handle, ready) = supervisor::spawn(Arc::clone(&self.shared));
        *slot = SupervisorSlot::Running(handle);
        drop(slot);

        Ok(ready.await.unwrap_or(false))
    }

    /// Stops everything: no reconnect will ever start again, every channel
    /// is unsubscribed, the source is closed, every client sink is closed
    /// and the registry is emptied. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.shared.connection.write().await.begin_shutdown();

        let previous = std::mem::replace(&mut *self.supervisor.lock().await, SupervisorSlot::Stopped);
        if let SupervisorSlot::Running(handle) = previous {
            let (ack, acked) = oneshot::channel();
            if handle.commands.send(SupervisorCommand::Shutdown { ack }).is_ok() {
                let _ = acked.await;
            }
            if let Err(e) = handle.task.await {
                tracing::error!(error = %e, "Supervisor task ended abnormally");
            }
        } else {
            self.shared.connection.write().await.mark_stopped();
        }

        let clients = self.shared.hub.write().await.close();
        for client in &clients {
            client.sink.close();
        }
        self.shared.stats.lock().await.current_connections = 0;

        tracing::info!(clients_closed = clients.len(), "Notification bridge shut down");
    }

    /// Drops any pending backoff, forgets past failures and reconnects now.
    /// Resolves with whether the bridge is connected afterwards.
    pub async fn force_reconnect(&self) -> Result<bool, BridgeError> {
        let commands = match &*self.supervisor.lock().await {
            SupervisorSlot::Running(handle) => handle.commands.clone(),
            SupervisorSlot::NotStarted => return Err(BridgeError::NotStarted),
            SupervisorSlot::Stopped => return Err(BridgeError::SupervisorStopped),
        };

        let (ack, connected) = oneshot::channel();
        commands
            .send(SupervisorCommand::ForceReconnect { ack })
            .map_err(|_| BridgeError::SupervisorStopped)?;
        connected.await.map_err(|_| BridgeError::SupervisorStopped)
    }

    /// Registers a client stream.
    ///
    /// Returns `false` when the registry is full or the bridge is shutting
    /// down. Re-using a live id replaces that registration and closes its
    /// sink.
    pub async fn register_client(
        &self,
        id: impl Into<String>,
        filters: ClientFilters,
        sink: Arc<dyn OutputSink>,
    ) -> bool {
        let id = id.into();
        if self.shared.connection.read().await.is_shutting_down() {
            tracing::warn!(client_id = %id, "Rejecting client registration during shutdown");
            return false;
        }

        let registration = self.shared.next_registration.fetch_add(1, Ordering::Relaxed);
        let connected_at = Timestamp::now();
        let client = RegisteredClient {
            id: id.clone(),
            filters: filters.clone(),
            sink: Arc::clone(&sink),
            connected_at,
            registration,
        };

        let mut hub = self.shared.hub.write().await;
        if hub.closed {
            tracing::warn!(client_id = %id, "Rejecting client registration during shutdown");
            return false;
        }
        let replaced = match hub.registry.insert(client) {
            Ok(replaced) => replaced,
            Err(CapacityExceeded { max_clients }) => {
                tracing::warn!(client_id = %id, max_clients, "Client registry full, rejecting registration");
                return false;
            }
        };

        {
            let mut stats = self.shared.stats.lock().await;
            if replaced.is_some() {
                stats.record_connection_closed();
            }
            stats.record_connection_opened();
        }

        if let Some(previous) = replaced {
            tracing::info!(client_id = %id, "Replacing existing client registration");
            previous.sink.close();
        }

        if let Some(client) = hub.registry.get(&id) {
            client.deliver(&SseFrame::connected(&id, connected_at));
        }

        let disconnected = sink.disconnected();
        let watcher = Arc::downgrade(&self.shared);
        let watched_id = id.clone();
        tokio::spawn(async move {
            disconnected.await;
            if let Some(shared) = watcher.upgrade() {
                shared
                    .remove_client(|registry| registry.remove_registration(&watched_id, registration))
                    .await;
            }
        });

        if hub.registry.len() == 1 && !hub.heartbeat.is_running() {
            let interval = self.shared.config.heartbeat.interval;
            hub.heartbeat
                .start(run_heartbeat(Arc::downgrade(&self.shared), interval));
        }

        tracing::info!(
            client_id = %id,
            device_filter = filters.device.as_deref(),
            user_filter = filters.user.as_deref(),
            total_clients = hub.registry.len(),
            "Client registered"
        );
        true
    }

    /// Removes a client. Unknown ids are a no-op returning `false`.
    pub async fn unregister_client(&self, id: &str) -> bool {
        self.shared.remove_client(|registry| registry.remove(id)).await
    }

    /// Administrative disconnect: sends a `disconnected` event, then closes
    /// the sink. The sink's disconnect notification removes the client.
    ///
    /// `actor` is only logged.
    pub async fn disconnect_client(&self, id: &str, actor: Option<&str>) -> bool {
        let hub = self.shared.hub.read().await;
        let Some(client) = hub.registry.get(id) else {
            return false;
        };

        client.deliver(&SseFrame::disconnected(ADMIN_DISCONNECT_REASON, Timestamp::now()));
        client.sink.close();

        tracing::info!(
            client_id = %id,
            actor = actor.unwrap_or("unknown"),
            "Client disconnected by administrator"
        );
        true
    }

    /// Current clients, oldest first.
    pub async fn clients(&self) -> Vec<ClientInfo> {
        let mut clients = self.shared.hub.read().await.registry.snapshot(Timestamp::now());
        clients.sort_by(|a, b| {
            a.connected_at
                .cmp(&b.connected_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        clients
    }

    pub async fn client_count(&self) -> usize {
        self.shared.hub.read().await.registry.len()
    }

    /// Writes an event to every client filtered on `device_id`.
    /// Returns the number of sinks attempted.
    pub async fn broadcast_to_device(&self, device_id: &str, event: &str, data: Value) -> usize {
        let frame = SseFrame::new(event, data);
        self.shared
            .hub
            .read()
            .await
            .registry
            .broadcast_to_device(device_id, &frame)
    }

    /// Writes an event to every client filtered on `user_id`.
    /// Returns the number of sinks attempted.
    pub async fn broadcast_to_user(&self, user_id: &str, event: &str, data: Value) -> usize {
        let frame = SseFrame::new(event, data);
        self.shared
            .hub
            .read()
            .await
            .registry
            .broadcast_to_user(user_id, &frame)
    }

    /// Writes an event to every client. Returns the number of sinks attempted.
    pub async fn broadcast_to_all(&self, event: &str, data: Value) -> usize {
        let frame = SseFrame::new(event, data);
        self.shared.hub.read().await.registry.broadcast_to_all(&frame)
    }

    /// Routes one notification as if it had arrived from the change source.
    pub async fn handle_notification(&self, notification: &Notification) -> RouteOutcome {
        self.shared.route(notification).await
    }

    pub async fn stats(&self) -> StatsSnapshot {
        let clients = self.shared.hub.read().await.registry.breakdown();
        let counters = self.shared.stats.lock().await.clone();
        let health = self.health().await;

        StatsSnapshot {
            counters,
            clients,
            health,
        }
    }

    pub async fn health(&self) -> ConnectionHealth {
        let last_event_received_at = self.shared.stats.lock().await.last_event_received_at;
        let connection = self.shared.connection.read().await;

        ConnectionHealth::evaluate(
            &connection,
            last_event_received_at,
            Timestamp::now(),
            self.shared.config.health_timeout,
            self.shared.channels.len(),
        )
    }

    pub async fn connection_phase(&self) -> ConnectionPhase {
        self.shared.connection.read().await.phase()
    }

    pub async fn is_heartbeat_running(&self) -> bool {
        self.shared.hub.read().await.heartbeat.is_running()
    }

    /// How many heartbeat timers have been started over the bridge's life.
    pub async fn heartbeat_start_count(&self) -> u64 {
        self.shared.hub.read().await.heartbeat.start_count()
    }

    /// Sanitized channel names this bridge subscribes to.
    pub fn channel_names(&self) -> Vec<&str> {
        self.shared.channels.iter().map(ChannelName::as_str).collect()
    }
}
