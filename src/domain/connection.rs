//! One attached client and its serialized outbound transport.
//!
//! A [`Connection`] owns the write half of a WebSocket behind a
//! [`tokio::sync::Mutex`]. Every write holds the lock for its full duration,
//! so the dispatcher and a concurrent close path can never interleave
//! frames on the same socket.

use std::fmt;
use std::pin::Pin;

use axum::extract::ws::Message;
use chrono::{DateTime, Utc};
use futures_util::{Sink, SinkExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::ChatMessage;
use crate::error::RelayError;

/// Outbound half of a client transport.
///
/// In production this is the `SplitSink` of an axum [`axum::extract::ws::WebSocket`];
/// tests substitute in-memory sinks.
pub type OutboundSink = Pin<Box<dyn Sink<Message, Error = axum::Error> + Send>>;

/// Unique identifier of a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Creates a new random `ConnectionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A client attached to exactly one channel for its lifetime.
///
/// The transport slot is `None` once the connection has been closed. The
/// first caller of [`Connection::close`] takes the sink and closes it; every
/// later caller finds the slot empty and returns without touching it.
pub struct Connection {
    id: ConnectionId,
    connected_at: DateTime<Utc>,
    sink: Mutex<Option<OutboundSink>>,
}

impl Connection {
    /// Wraps the outbound half of a freshly attached transport.
    #[must_use]
    pub fn new(sink: OutboundSink) -> Self {
        Self {
            id: ConnectionId::new(),
            connected_at: Utc::now(),
            sink: Mutex::new(Some(sink)),
        }
    }

    /// Returns this connection's identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the time the client attached.
    #[must_use]
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Writes one message to the client.
    ///
    /// Holds the serialization lock for the whole write. There is no retry:
    /// a failed write means the client is gone and should be evicted.
    ///
    /// # Errors
    ///
    /// - [`RelayError::ConnectionClosed`] if the connection was already closed.
    /// - [`RelayError::MalformedPayload`] if the message cannot be encoded.
    /// - [`RelayError::Transport`] if the underlying write fails.
    pub async fn send(&self, message: &ChatMessage) -> Result<(), RelayError> {
        let text = serde_json::to_string(message)?;
        let mut slot = self.sink.lock().await;
        let sink = slot.as_mut().ok_or(RelayError::ConnectionClosed)?;
        sink.send(Message::text(text)).await?;
        Ok(())
    }

    /// Closes the transport. Safe to call any number of times from any task.
    ///
    /// Returns `true` for the call that actually closed the transport and
    /// `false` for every later one. Errors raised while closing are logged
    /// and swallowed so the calling path is never failed by them.
    pub async fn close(&self) -> bool {
        let Some(mut sink) = self.sink.lock().await.take() else {
            tracing::debug!(connection_id = %self.id, "connection already closed");
            return false;
        };
        if let Err(e) = sink.close().await {
            tracing::debug!(connection_id = %self.id, error = %e, "error closing transport");
        }
        true
    }

    /// Returns `true` once [`Connection::close`] has run.
    pub async fn is_closed(&self) -> bool {
        self.sink.lock().await.is_none()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("connected_at", &self.connected_at)
            .finish_non_exhaustive()
    }
}
