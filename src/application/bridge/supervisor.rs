//! Connection supervisor: owns the single change-source handle.
//!
//! Runs as one task driven by a small step machine. Commands from the
//! bridge (forced reconnect, shutdown) arrive over a channel and preempt
//! whatever the loop is waiting on, which is how a pending backoff timer
//! gets cancelled.
//!
//! ```text
//!        ┌───────────────────────────────┐
//!        ▼                               │
//!   Connect ──ok──► Listen ──error──► schedule ──retry──► Wait ──timer──┘
//!      │                                  │
//!      └──fail──► schedule                └──exhausted──► Idle ──force──► Connect
//!
//!   any step ── Shutdown / bridge dropped ──► Stop
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;

use crate::domain::connection::ReconnectDecision;
use crate::domain::notification::Notification;
use crate::ports::{ChangeSource, ChangeSourceError};

use super::BridgeShared;

/// Requests sent from the bridge to the supervisor task.
pub(crate) enum SupervisorCommand {
    /// Drop any pending timer and reconnect now; acks with the outcome.
    ForceReconnect { ack: oneshot::Sender<bool> },
    /// Unsubscribe, close and exit.
    Shutdown { ack: oneshot::Sender<()> },
}

/// Bridge-side handle to the running supervisor.
pub(crate) struct SupervisorHandle {
    pub commands: mpsc::UnboundedSender<SupervisorCommand>,
    pub task: JoinHandle<()>,
}

/// Spawns the supervisor. The receiver resolves with the outcome of the
/// first connect attempt.
pub(crate) fn spawn(shared: Arc<BridgeShared>) -> (SupervisorHandle, oneshot::Receiver<bool>) {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (ready_tx, ready_rx) = oneshot::channel();

    let supervisor = Supervisor {
        shared,
        commands: commands_rx,
        source: None,
    };
    let task = tokio::spawn(supervisor.run(ready_tx));

    (
        SupervisorHandle {
            commands: commands_tx,
            task,
        },
        ready_rx,
    )
}

enum Step {
    Connect { ack: Option<oneshot::Sender<bool>> },
    Listen,
    Wait(Duration),
    Idle,
    Stop(Option<oneshot::Sender<()>>),
}

enum ListenEvent {
    Command(Option<SupervisorCommand>),
    Received(Result<Notification, ChangeSourceError>),
}

struct Supervisor {
    shared: Arc<BridgeShared>,
    commands: mpsc::UnboundedReceiver<SupervisorCommand>,
    source: Option<Box<dyn ChangeSource>>,
}

impl Supervisor {
    async fn run(mut self, ready: oneshot::Sender<bool>) {
        let mut step = Step::Connect { ack: Some(ready) };

        loop {
            if self.shared.connection.read().await.is_shutting_down() {
                step = match step {
                    Step::Connect { ack: Some(ack) } => {
                        let _ = ack.send(false);
                        Step::Stop(None)
                    }
                    Step::Stop(ack) => Step::Stop(ack),
                    _ => Step::Stop(None),
                };
            }

            step = match step {
                Step::Connect { ack } => self.connect(ack).await,
                Step::Listen => self.listen().await,
                Step::Wait(delay) => self.wait(delay).await,
                Step::Idle => {
                    let command = self.commands.recv().await;
                    self.on_command(command).await
                }
                Step::Stop(ack) => {
                    self.stop().await;
                    if let Some(ack) = ack {
                        let _ = ack.send(());
                    }
                    return;
                }
            };
        }
    }

    async fn connect(&mut self, ack: Option<oneshot::Sender<bool>>) -> Step {
        if !self.shared.connection.write().await.begin_connect() {
            if let Some(ack) = ack {
                let _ = ack.send(false);
            }
            return Step::Stop(None);
        }

        self.teardown().await;

        match self.open().await {
            Ok(source) => {
                self.source = Some(source);
                self.shared.connection.write().await.mark_connected();
                tracing::info!(
                    channels = self.shared.channels.len(),
                    "Connected to change source"
                );
                if let Some(ack) = ack {
                    let _ = ack.send(true);
                }
                Step::Listen
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to connect to change source");
                self.shared.connection.write().await.mark_disconnected();
                let next = self.schedule_reconnect().await;
                if let Some(ack) = ack {
                    let _ = ack.send(false);
                }
                next
            }
        }
    }

    /// Opens a handle and subscribes every channel.
    async fn open(&mut self) -> Result<Box<dyn ChangeSource>, ChangeSourceError> {
        let mut source = self.shared.connector.connect().await?;

        for channel in &self.shared.channels {
            if let Err(e) = source.listen(channel).await {
                if let Err(close_err) = source.close().await {
                    tracing::debug!(error = %close_err, "Error closing half-open change source");
                }
                return Err(e);
            }
            tracing::debug!(channel = %channel, "Listening on channel");
        }

        Ok(source)
    }

    async fn listen(&mut self) -> Step {
        let event = {
            let Some(source) = self.source.as_mut() else {
                return self.schedule_reconnect().await;
            };
            tokio::select! {
                biased;
                command = self.commands.recv() => ListenEvent::Command(command),
                received = source.recv() => ListenEvent::Received(received),
            }
        };

        match event {
            ListenEvent::Command(command) => self.on_command(command).await,
            ListenEvent::Received(Ok(notification)) => {
                self.shared.route(&notification).await;
                Step::Listen
            }
            ListenEvent::Received(Err(e)) => {
                tracing::warn!(error = %e, "Change source error");
                self.shared.connection.write().await.mark_disconnected();
                self.teardown().await;
                self.schedule_reconnect().await
            }
        }
    }

    async fn wait(&mut self, delay: Duration) -> Step {
        let command = tokio::select! {
            biased;
            command = self.commands.recv() => Some(command),
            _ = time::sleep(delay) => None,
        };

        match command {
            Some(command) => self.on_command(command).await,
            None => Step::Connect { ack: None },
        }
    }

    async fn on_command(&mut self, command: Option<SupervisorCommand>) -> Step {
        match command {
            Some(SupervisorCommand::ForceReconnect { ack }) => {
                tracing::info!("Forced reconnect requested");
                self.shared.connection.write().await.reset_for_force();
                Step::Connect { ack: Some(ack) }
            }
            Some(SupervisorCommand::Shutdown { ack }) => Step::Stop(Some(ack)),
            None => Step::Stop(None),
        }
    }

    async fn schedule_reconnect(&mut self) -> Step {
        let policy = self.shared.config.reconnect;
        let decision = self.shared.connection.write().await.schedule_reconnect(&policy);

        match decision {
            ReconnectDecision::Retry { attempt, delay } => {
                self.shared.stats.lock().await.reconnection_attempts += 1;
                tracing::info!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling change source reconnect"
                );
                Step::Wait(delay)
            }
            ReconnectDecision::AlreadyReconnecting => {
                tracing::debug!("Reconnect already pending");
                Step::Idle
            }
            ReconnectDecision::Exhausted { attempts } => {
                tracing::error!(
                    attempts,
                    "Max reconnection attempts reached; waiting for forced reconnect"
                );
                Step::Idle
            }
            ReconnectDecision::ShuttingDown => Step::Stop(None),
        }
    }

    /// Best-effort unsubscribe and close of the current handle.
    async fn teardown(&mut self) {
        let Some(mut source) = self.source.take() else {
            return;
        };

        for channel in &self.shared.channels {
            if let Err(e) = source.unlisten(channel).await {
                tracing::debug!(channel = %channel, error = %e, "Unlisten failed");
            }
        }
        if let Err(e) = source.close().await {
            tracing::debug!(error = %e, "Closing change source failed");
        }
    }

    async fn stop(&mut self) {
        self.shared.connection.write().await.begin_shutdown();
        self.teardown().await;
        self.shared.connection.write().await.mark_stopped();

        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            match command {
                SupervisorCommand::ForceReconnect { ack } => {
                    let _ = ack.send(false);
                }
                SupervisorCommand::Shutdown { ack } => {
                    let _ = ack.send(());
                }
            }
        }

        tracing::info!("Change source supervisor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::ScriptedConnector;
    use crate::application::bridge::{BridgeConfig, NotificationBridge};
    use crate::domain::connection::{ConnectionPhase, ReconnectPolicy};

    fn bridge(connector: &ScriptedConnector, policy: ReconnectPolicy) -> NotificationBridge {
        NotificationBridge::new(
            BridgeConfig::default().with_reconnect(policy),
            Arc::new(connector.clone()),
            ["device_events", "user_events"],
        )
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn connects_and_listens_on_every_channel() {
        let connector = ScriptedConnector::new();
        let bridge = bridge(&connector, ReconnectPolicy::default());

        assert_eq!(bridge.start().await, Ok(true));

        assert!(bridge.health().await.is_connected);
        assert_eq!(
            connector.listened_channels(),
            vec!["device_events".to_string(), "user_events".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_exponential_backoff_until_connected() {
        let connector = ScriptedConnector::new();
        connector.fail_next_connects(3);
        let bridge = bridge(&connector, ReconnectPolicy::default());

        assert_eq!(bridge.start().await, Ok(false));
        assert_eq!(connector.connect_attempts(), 1);

        // Delays: 1s, 2s, 4s.
        time::sleep(Duration::from_millis(1_001)).await;
        settle().await;
        assert_eq!(connector.connect_attempts(), 2);

        time::sleep(Duration::from_millis(2_001)).await;
        settle().await;
        assert_eq!(connector.connect_attempts(), 3);
        assert!(!bridge.health().await.is_connected);

        time::sleep(Duration::from_millis(4_001)).await;
        settle().await;
        assert_eq!(connector.connect_attempts(), 4);

        let health = bridge.health().await;
        assert!(health.is_connected);
        assert_eq!(health.reconnect_attempts, 0);
        assert_eq!(bridge.stats().await.counters.reconnection_attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_max_attempts_until_forced() {
        let connector = ScriptedConnector::new();
        connector.fail_next_connects(100);
        let policy = ReconnectPolicy::default()
            .with_base_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_millis(10))
            .with_max_attempts(2);
        let bridge = bridge(&connector, policy);

        bridge.start().await.unwrap();
        time::sleep(Duration::from_secs(5)).await;
        settle().await;

        // Initial attempt plus two retries.
        assert_eq!(connector.connect_attempts(), 3);
        assert_eq!(bridge.connection_phase().await, ConnectionPhase::Exhausted);
        let health = bridge.health().await;
        assert!(!health.is_reconnecting);
        assert!(health.is_exhausted);

        connector.fail_next_connects(0);
        assert_eq!(bridge.force_reconnect().await, Ok(true));
        assert_eq!(connector.connect_attempts(), 4);
        let health = bridge.health().await;
        assert!(health.is_connected);
        assert!(!health.is_exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn source_error_triggers_reconnect() {
        let connector = ScriptedConnector::new();
        let bridge = bridge(&connector, ReconnectPolicy::default());
        bridge.start().await.unwrap();

        assert!(connector.fail_connection());
        settle().await;

        assert!(!bridge.health().await.is_connected);
        assert!(bridge.health().await.is_reconnecting);
        assert_eq!(connector.close_count(), 1);

        time::sleep(Duration::from_millis(1_001)).await;
        settle().await;

        assert!(bridge.health().await.is_connected);
        assert_eq!(connector.connect_attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn force_reconnect_cancels_pending_timer() {
        let connector = ScriptedConnector::new();
        connector.fail_next_connects(1);
        let policy = ReconnectPolicy::default().with_base_delay(Duration::from_secs(30));
        let bridge = bridge(&connector, policy);

        assert_eq!(bridge.start().await, Ok(false));
        assert!(bridge.health().await.is_reconnecting);

        assert_eq!(bridge.force_reconnect().await, Ok(true));
        assert_eq!(connector.connect_attempts(), 2);

        // The cancelled 30s timer must not cause another connect.
        time::sleep(Duration::from_secs(31)).await;
        settle().await;
        assert_eq!(connector.connect_attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn listen_failure_counts_as_connect_failure() {
        let connector = ScriptedConnector::new();
        connector.fail_listen(true);
        let bridge = bridge(&connector, ReconnectPolicy::default());

        assert_eq!(bridge.start().await, Ok(false));
        assert!(bridge.health().await.is_reconnecting);
        assert_eq!(connector.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_unlistens_and_never_reconnects() {
        let connector = ScriptedConnector::new();
        let bridge = bridge(&connector, ReconnectPolicy::default());
        bridge.start().await.unwrap();

        bridge.shutdown().await;

        assert_eq!(connector.unlistened_channels().len(), 2);
        assert_eq!(connector.close_count(), 1);
        assert!(!connector.fail_connection());

        time::sleep(Duration::from_secs(120)).await;
        settle().await;
        assert_eq!(connector.connect_attempts(), 1);
        assert_eq!(bridge.connection_phase().await, ConnectionPhase::Stopped);
    }
}
