//! Domain layer: the connection registry and broadcast dispatch engine.
//!
//! This module holds everything with shared state or concurrency
//! obligations: channel identity, the stamped message record, the
//! serialized per-client connection, the channel registry, and the
//! dispatch queue with its single dispatcher.

pub mod channel_id;
pub mod channel_registry;
pub mod chat_message;
pub mod connection;
pub mod dispatcher;

pub use channel_id::ChannelId;
pub use channel_registry::ChannelRegistry;
pub use chat_message::ChatMessage;
pub use connection::{Connection, ConnectionId};
pub use dispatcher::{DispatchQueue, Dispatcher, FanOut};
