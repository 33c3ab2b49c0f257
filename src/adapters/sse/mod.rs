//! Server-sent-event output sink backed by an `axum` response body.
//!
//! ```text
//! bridge ──write()──► SseSink ──mpsc──► SseStream ──Body──► HTTP client
//!                        │                  │
//!                     close()          dropped by axum when the
//!                        │             client goes away
//!                        └──────► disconnected() resolves
//! ```
//!
//! The route layer that accepts the HTTP request creates a pair with
//! [`sse_channel`], registers the sink with the bridge and returns the
//! stream as the response.
//!
//! Each pair buffers at most `capacity` frames. A client that stops reading
//! has further frames rejected until it catches up or disconnects.

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use futures::stream;
use http::header;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};

use crate::domain::notification::SseFrame;
use crate::ports::{OutputSink, SinkError};

/// Frames buffered per client when no capacity is configured.
pub const DEFAULT_SSE_BUFFER: usize = 128;

/// Creates a connected sink/stream pair for one client.
///
/// `capacity` bounds the frames queued for a slow reader; zero is treated
/// as one.
pub fn sse_channel(capacity: usize) -> (SseSink, SseStream) {
    let (frames_tx, frames_rx) = mpsc::channel(capacity.max(1));
    let (closing_tx, closing_rx) = watch::channel(false);

    (
        SseSink {
            frames: frames_tx,
            closing: closing_tx,
        },
        SseStream {
            frames: frames_rx,
            closing: closing_rx,
        },
    )
}

/// Writing half: handed to the bridge.
pub struct SseSink {
    frames: mpsc::Sender<SseFrame>,
    closing: watch::Sender<bool>,
}

impl OutputSink for SseSink {
    fn write(&self, frame: &SseFrame) -> Result<(), SinkError> {
        if *self.closing.borrow() {
            return Err(SinkError::Closed);
        }
        self.frames.try_send(frame.clone()).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Rejected("buffer full".to_string()),
            TrySendError::Closed(_) => SinkError::Closed,
        })
    }

    fn close(&self) {
        self.closing.send_replace(true);
    }

    fn disconnected(&self) -> BoxFuture<'static, ()> {
        let frames = self.frames.clone();
        let mut closing = self.closing.subscribe();
        Box::pin(async move {
            tokio::select! {
                _ = frames.closed() => {}
                _ = closing.wait_for(|closing| *closing) => {}
            }
        })
    }
}

/// Reading half: becomes the HTTP response body.
///
/// Frames queued before `close()` are still sent; the body ends once the
/// queue is empty.
pub struct SseStream {
    frames: mpsc::Receiver<SseFrame>,
    closing: watch::Receiver<bool>,
}

impl SseStream {
    async fn next_chunk(&mut self) -> Option<Bytes> {
        tokio::select! {
            biased;
            frame = self.frames.recv() => frame.map(|frame| Bytes::from(frame.render())),
            _ = self.closing.wait_for(|closing| *closing) => {
                self.frames.try_recv().ok().map(|frame| Bytes::from(frame.render()))
            }
        }
    }

    /// Converts into a streaming body of rendered frames.
    pub fn into_body(self) -> Body {
        let chunks = stream::unfold(self, |mut stream| async move {
            let chunk = stream.next_chunk().await?;
            Some((Ok::<_, Infallible>(chunk), stream))
        });
        Body::from_stream(chunks)
    }
}

impl IntoResponse for SseStream {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            self.into_body(),
        )
            .into_response()
    }
}
