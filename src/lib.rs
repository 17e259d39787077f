//! # chat-relay
//!
//! Real-time WebSocket relay. Clients attach to a named channel, publish
//! text messages on it, and receive every message published to that
//! channel by any attached client, in publish order.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket /message-slot/{id})
//!     │
//!     ├── IngressHandler, one per connection (ws/)
//!     │
//!     ├── DispatchQueue (domain/)
//!     ├── Dispatcher, single consumer (domain/)
//!     │
//!     ├── ChannelRegistry (domain/)
//!     └── Connection::send → every subscriber of the channel
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod router;
pub mod ws;
