//! Change source driven from test code.
//!
//! The connector hands out [`ScriptedSource`] handles; the test pushes
//! notifications or failures into whichever handle is current.
//!
//! This adapter is for **testing only**. It uses `.expect()` on lock
//! operations which will panic if locks are poisoned.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::notification::{ChannelName, Notification};
use crate::ports::{ChangeSource, ChangeSourceConnector, ChangeSourceError};

type Feed = mpsc::UnboundedSender<Result<Notification, ChangeSourceError>>;

#[derive(Default)]
struct Script {
    connect_attempts: AtomicUsize,
    failing_connects: AtomicUsize,
    fail_listen: AtomicBool,
    close_calls: AtomicUsize,
    listened: RwLock<Vec<String>>,
    unlistened: RwLock<Vec<String>>,
    current: RwLock<Option<Feed>>,
}

/// Connector whose behaviour is scripted by the test.
///
/// Cloning shares the script, so a test can keep one clone and hand
/// another to the bridge.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    script: Arc<Script>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    // === Scripting ===

    /// Fails the next `count` connect attempts. Zero clears pending failures.
    pub fn fail_next_connects(&self, count: usize) {
        self.script.failing_connects.store(count, Ordering::SeqCst);
    }

    /// Makes `listen` fail on every subsequently opened source.
    pub fn fail_listen(&self, fail: bool) {
        self.script.fail_listen.store(fail, Ordering::SeqCst);
    }

    /// Delivers a notification through the current source.
    /// Returns false if no source is open.
    pub fn notify(&self, channel: &str, payload: &str) -> bool {
        self.push(Ok(Notification::new(channel, payload)))
    }

    /// Reports a lost connection through the current source.
    /// Returns false if no source is open.
    pub fn fail_connection(&self) -> bool {
        self.push(Err(ChangeSourceError::ConnectionLost))
    }

    // === Inspection ===

    pub fn connect_attempts(&self) -> usize {
        self.script.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.script.close_calls.load(Ordering::SeqCst)
    }

    /// Every successful `listen`, across all sources.
    pub fn listened_channels(&self) -> Vec<String> {
        self.script
            .listened
            .read()
            .expect("ScriptedConnector: listened lock poisoned")
            .clone()
    }

    /// Every `unlisten`, across all sources.
    pub fn unlistened_channels(&self) -> Vec<String> {
        self.script
            .unlistened
            .read()
            .expect("ScriptedConnector: unlistened lock poisoned")
            .clone()
    }

    fn push(&self, item: Result<Notification, ChangeSourceError>) -> bool {
        self.script
            .current
            .read()
            .expect("ScriptedConnector: current lock poisoned")
            .as_ref()
            .map(|feed| feed.send(item).is_ok())
            .unwrap_or(false)
    }
}

#[async_trait]
impl ChangeSourceConnector for ScriptedConnector {
    async fn connect(&self) -> Result<Box<dyn ChangeSource>, ChangeSourceError> {
        self.script.connect_attempts.fetch_add(1, Ordering::SeqCst);

        let failing = self.script.failing_connects.load(Ordering::SeqCst);
        if failing > 0 {
            self.script
                .failing_connects
                .store(failing - 1, Ordering::SeqCst);
            return Err(ChangeSourceError::Connect("scripted connect failure".to_string()));
        }

        let (feed, inbox) = mpsc::unbounded_channel();
        *self
            .script
            .current
            .write()
            .expect("ScriptedConnector: current write lock poisoned") = Some(feed);

        Ok(Box::new(ScriptedSource {
            script: Arc::clone(&self.script),
            inbox,
        }))
    }
}

/// Source handle produced by [`ScriptedConnector`].
pub struct ScriptedSource {
    script: Arc<Script>,
    inbox: mpsc::UnboundedReceiver<Result<Notification, ChangeSourceError>>,
}

#[async_trait]
impl ChangeSource for ScriptedSource {
    async fn listen(&mut self, channel: &ChannelName) -> Result<(), ChangeSourceError> {
        if self.script.fail_listen.load(Ordering::SeqCst) {
            return Err(ChangeSourceError::Listen {
                channel: channel.to_string(),
                reason: "scripted listen failure".to_string(),
            });
        }
        self.script
            .listened
            .write()
            .expect("ScriptedConnector: listened write lock poisoned")
            .push(channel.to_string());
        Ok(())
    }

    async fn unlisten(&mut self, channel: &ChannelName) -> Result<(), ChangeSourceError> {
        self.script
            .unlistened
            .write()
            .expect("ScriptedConnector: unlistened write lock poisoned")
            .push(channel.to_string());
        Ok(())
    }

    async fn recv(&mut self) -> Result<Notification, ChangeSourceError> {
        match self.inbox.recv().await {
            Some(item) => item,
            None => Err(ChangeSourceError::ConnectionLost),
        }
    }

    async fn close(mut self: Box<Self>) -> Result<(), ChangeSourceError> {
        self.inbox.close();
        self.script.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
