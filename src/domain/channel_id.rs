//! Type-safe channel identifier.
//!
//! [`ChannelId`] wraps the channel name taken from the attach path so it
//! cannot be confused with message bodies or other free-form strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a broadcast channel.
///
/// Extracted by the server from the `/message-slot/{id}` path when a client
/// attaches. It is the dictionary key in [`super::ChannelRegistry`] and the
/// `chat_id` field of every outbound message. Client payloads never set it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Creates a `ChannelId` from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the channel name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ChannelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
