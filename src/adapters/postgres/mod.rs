//! PostgreSQL adapter - `LISTEN`/`NOTIFY` change source.
//!
//! Each connect opens one dedicated `PgListener` connection. sqlx would
//! silently reconnect a listener whose connection dropped; `try_recv`
//! is used instead so the loss is reported and the bridge's own backoff
//! decides when to reconnect.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgListener;

use crate::config::DatabaseConfig;
use crate::domain::notification::{ChannelName, Notification};
use crate::ports::{ChangeSource, ChangeSourceConnector, ChangeSourceError};

/// Opens `PgListener` connections against one database.
pub struct PgChangeSourceConnector {
    url: String,
    connect_timeout: Duration,
}

impl PgChangeSourceConnector {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(config.url.clone(), config.connect_timeout())
    }
}

impl std::fmt::Debug for PgChangeSourceConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgChangeSourceConnector")
            .field("url", &crate::config::redact_url(&self.url))
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[async_trait]
impl ChangeSourceConnector for PgChangeSourceConnector {
    async fn connect(&self) -> Result<Box<dyn ChangeSource>, ChangeSourceError> {
        let listener = tokio::time::timeout(self.connect_timeout, PgListener::connect(&self.url))
            .await
            .map_err(|_| {
                ChangeSourceError::Connect(format!(
                    "timed out after {}ms",
                    self.connect_timeout.as_millis()
                ))
            })?
            .map_err(|e| ChangeSourceError::Connect(e.to_string()))?;

        Ok(Box::new(PgChangeSource {
            listener,
            lost: false,
        }))
    }
}

/// One live `LISTEN` connection.
pub struct PgChangeSource {
    listener: PgListener,
    /// Set once the connection dropped; further I/O would make sqlx
    /// reconnect behind our back.
    lost: bool,
}

#[async_trait]
impl ChangeSource for PgChangeSource {
    async fn listen(&mut self, channel: &ChannelName) -> Result<(), ChangeSourceError> {
        self.listener
            .listen(channel.as_str())
            .await
            .map_err(|e| ChangeSourceError::Listen {
                channel: channel.to_string(),
                reason: e.to_string(),
            })
    }

    async fn unlisten(&mut self, channel: &ChannelName) -> Result<(), ChangeSourceError> {
        if self.lost {
            return Ok(());
        }
        self.listener
            .unlisten(channel.as_str())
            .await
            .map_err(|e| ChangeSourceError::Unlisten {
                channel: channel.to_string(),
                reason: e.to_string(),
            })
    }

    async fn recv(&mut self) -> Result<Notification, ChangeSourceError> {
        if self.lost {
            return Err(ChangeSourceError::ConnectionLost);
        }
        match self.listener.try_recv().await {
            Ok(Some(notification)) => Ok(Notification::new(
                notification.channel(),
                notification.payload(),
            )),
            Ok(None) => {
                self.lost = true;
                Err(ChangeSourceError::ConnectionLost)
            }
            Err(e) => Err(ChangeSourceError::Receive(e.to_string())),
        }
    }

    async fn close(mut self: Box<Self>) -> Result<(), ChangeSourceError> {
        if self.lost {
            return Ok(());
        }
        self.listener
            .unlisten_all()
            .await
            .map_err(|e| ChangeSourceError::Close(e.to_string()))
    }
}
