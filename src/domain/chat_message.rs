//! The message record that flows from ingress to every subscriber.

use chrono::Utc;
use serde::Serialize;

use super::ChannelId;

/// A published message, stamped by the server at ingress.
///
/// Serializes to the outbound wire shape:
/// ```json
/// { "chat_id": "room1", "message": "hi", "timestamp": 1700000000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Channel the message was published on. Always server-assigned.
    pub chat_id: ChannelId,
    /// Client-supplied payload.
    pub message: String,
    /// Unix timestamp in seconds, assigned when the message was read.
    pub timestamp: i64,
}

impl ChatMessage {
    /// Stamps a client payload with its channel and the current time.
    #[must_use]
    pub fn stamp(chat_id: ChannelId, message: String) -> Self {
        Self {
            chat_id,
            message,
            timestamp: Utc::now().timestamp(),
        }
    }
}
