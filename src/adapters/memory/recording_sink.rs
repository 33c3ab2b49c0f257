//! Output sink that records every frame for assertions.
//!
//! # Security Note
//!
//! This adapter is for **testing only**. It uses `.expect()` on lock
//! operations which will panic if locks are poisoned.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use futures::future::BoxFuture;
use tokio::sync::watch;

use crate::domain::notification::SseFrame;
use crate::ports::{OutputSink, SinkError};

/// Output sink capturing frames in memory.
///
/// # Example
///
/// ```ignore
/// let sink = Arc::new(RecordingSink::new());
/// bridge.register_client("a", ClientFilters::none(), sink.clone()).await;
///
/// assert_eq!(sink.events(), vec!["connected"]);
/// ```
pub struct RecordingSink {
    frames: RwLock<Vec<SseFrame>>,
    fail_writes: AtomicBool,
    close_calls: AtomicUsize,
    gone: watch::Sender<bool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        let (gone, _) = watch::channel(false);
        Self {
            frames: RwLock::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            gone,
        }
    }

    // === Test Helpers ===

    /// Frames written so far, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn frames(&self) -> Vec<SseFrame> {
        self.frames
            .read()
            .expect("RecordingSink: frames lock poisoned")
            .clone()
    }

    /// Event names written so far.
    pub fn events(&self) -> Vec<String> {
        self.frames()
            .iter()
            .map(|frame| frame.event().to_string())
            .collect()
    }

    /// Makes every later write fail with [`SinkError::Rejected`].
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.close_count() > 0
    }

    /// Resolves `disconnected()` as if the remote end went away.
    pub fn simulate_remote_disconnect(&self) {
        self.gone.send_replace(true);
    }

    fn is_gone(&self) -> bool {
        *self.gone.borrow()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for RecordingSink {
    fn write(&self, frame: &SseFrame) -> Result<(), SinkError> {
        if self.is_gone() {
            return Err(SinkError::Closed);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SinkError::Rejected("write failure requested".to_string()));
        }
        self.frames
            .write()
            .expect("RecordingSink: frames write lock poisoned")
            .push(frame.clone());
        Ok(())
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.gone.send_replace(true);
    }

    fn disconnected(&self) -> BoxFuture<'static, ()> {
        let mut gone = self.gone.subscribe();
        Box::pin(async move {
            let _ = gone.wait_for(|gone| *gone).await;
        })
    }
}
