//! WebSocket layer: upgrade handling, inbound payloads, and the
//! per-connection read loop.
//!
//! Clients attach at `/message-slot/{id}`, where `{id}` names the channel
//! they publish to and receive from.

pub mod handler;
pub mod ingress;
pub mod messages;
