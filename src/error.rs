//! Relay error types.
//!
//! [`RelayError`] covers every failure the engine can observe while serving
//! a connection. None of them is fatal to the process: each one ends, at
//! most, the session of the connection that produced it.

/// Failures raised while reading from, writing to, or dispatching for a
/// single connection.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The connection's transport has already been closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// The underlying WebSocket transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] axum::Error),

    /// An inbound frame was not a valid `{"message": string}` payload, or
    /// an outbound message could not be encoded.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// The dispatcher task has stopped and no longer accepts messages.
    #[error("dispatcher stopped")]
    DispatcherStopped,
}

impl RelayError {
    /// Returns `true` when the error means the peer went away rather than
    /// misbehaved.
    #[must_use]
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, Self::ConnectionClosed | Self::Transport(_))
    }
}
