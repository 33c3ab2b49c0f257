//! Connection state machine for the upstream change source.
//!
//! ## Phases
//!
//! ```text
//!                 ┌──────────── force ─────────────┐
//!                 ▼                                │
//! Disconnected ─► Connecting ─► Connected          │
//!      ▲              │             │              │
//!      │           failure        error            │
//!      │              ▼             ▼              │
//!      └──────── schedule_reconnect() ─► Reconnecting ─(timer)─► Connecting
//!                                    └─► Exhausted ────────────────┘
//!
//! any phase ── shutdown ──► Stopped (terminal)
//! ```

use std::time::Duration;

use super::ReconnectPolicy;

/// Where the supervisor currently is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Connected,
    /// A backoff timer of `delay` is armed.
    Reconnecting { delay: Duration },
    /// `max_attempts` consecutive failures; waiting for a forced reconnect.
    Exhausted,
    Stopped,
}

/// Outcome of asking the state machine to schedule a reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Arm a one-shot timer of `delay`; this is retry number `attempt`.
    Retry { attempt: u32, delay: Duration },
    /// A reconnect is already pending.
    AlreadyReconnecting,
    /// Shutdown has begun; never reconnect.
    ShuttingDown,
    /// Gave up after `attempts` tries.
    Exhausted { attempts: u32 },
}

/// Connection bookkeeping owned by the supervisor and read by health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    phase: ConnectionPhase,
    attempts: u32,
    shutting_down: bool,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionState {
    pub fn new() -> Self {
        Self {
            phase: ConnectionPhase::Disconnected,
            attempts: 0,
            shutting_down: false,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// True only while the source is live and subscribed.
    pub fn is_initialized(&self) -> bool {
        self.phase == ConnectionPhase::Connected
    }

    /// True while a backoff timer is pending.
    pub fn is_reconnecting(&self) -> bool {
        matches!(self.phase, ConnectionPhase::Reconnecting { .. })
    }

    pub fn is_exhausted(&self) -> bool {
        self.phase == ConnectionPhase::Exhausted
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// Attempts since the last successful connect.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Enters `Connecting`. Returns false once shutdown has begun.
    pub fn begin_connect(&mut self) -> bool {
        if self.shutting_down {
            return false;
        }
        self.phase = ConnectionPhase::Connecting;
        true
    }

    /// Source is live and every channel is subscribed.
    pub fn mark_connected(&mut self) {
        if self.shutting_down {
            return;
        }
        self.phase = ConnectionPhase::Connected;
        self.attempts = 0;
    }

    /// Connect attempt failed or the live source reported an error.
    pub fn mark_disconnected(&mut self) {
        if self.phase != ConnectionPhase::Stopped {
            self.phase = ConnectionPhase::Disconnected;
        }
    }

    /// Decides whether and when to retry.
    pub fn schedule_reconnect(&mut self, policy: &ReconnectPolicy) -> ReconnectDecision {
        if self.shutting_down {
            return ReconnectDecision::ShuttingDown;
        }
        if self.is_reconnecting() {
            return ReconnectDecision::AlreadyReconnecting;
        }
        if self.attempts >= policy.max_attempts {
            self.phase = ConnectionPhase::Exhausted;
            return ReconnectDecision::Exhausted {
                attempts: self.attempts,
            };
        }

        self.attempts += 1;
        let delay = policy.delay_for(self.attempts);
        self.phase = ConnectionPhase::Reconnecting { delay };
        ReconnectDecision::Retry {
            attempt: self.attempts,
            delay,
        }
    }

    /// Operator override: forget past failures and drop any pending timer.
    pub fn reset_for_force(&mut self) {
        self.attempts = 0;
        if self.phase != ConnectionPhase::Stopped {
            self.phase = ConnectionPhase::Disconnected;
        }
    }

    /// One-way flag; nothing connects after this.
    pub fn begin_shutdown(&mut self) {
        self.shutting_down = true;
    }

    pub fn mark_stopped(&mut self) {
        self.shutting_down = true;
        self.phase = ConnectionPhase::Stopped;
    }
}
