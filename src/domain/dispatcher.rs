//! The dispatch queue and its single consumer.
//!
//! Every ingress handler publishes into one unbounded
//! [`tokio::sync::mpsc`] queue. A single [`Dispatcher`] task drains it and
//! fans each message out to the current subscribers of its channel. With
//! exactly one consumer, messages on the same channel reach every
//! subscriber in the order they were dequeued.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{ChannelRegistry, ChatMessage};
use crate::error::RelayError;

/// Producer handle of the dispatch queue.
///
/// Cheap to clone; each ingress handler holds one.
#[derive(Debug, Clone)]
pub struct DispatchQueue {
    sender: mpsc::UnboundedSender<ChatMessage>,
}

impl DispatchQueue {
    /// Creates a queue and returns its consumer end.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChatMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Hands a stamped message to the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::DispatcherStopped`] if the dispatcher is gone.
    pub fn publish(&self, message: ChatMessage) -> Result<(), RelayError> {
        self.sender
            .send(message)
            .map_err(|_| RelayError::DispatcherStopped)
    }
}

/// Outcome of fanning out one message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    /// Subscribers that accepted the message.
    pub delivered: usize,
    /// Subscribers whose send failed and that were evicted.
    pub evicted: usize,
}

/// Sole consumer of the dispatch queue.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<ChannelRegistry>,
    receiver: mpsc::UnboundedReceiver<ChatMessage>,
}

impl Dispatcher {
    /// Creates a dispatcher draining `receiver` against `registry`.
    #[must_use]
    pub fn new(
        registry: Arc<ChannelRegistry>,
        receiver: mpsc::UnboundedReceiver<ChatMessage>,
    ) -> Self {
        Self { registry, receiver }
    }

    /// Creates a queue, spawns its dispatcher, and returns the producer
    /// handle with the dispatcher's task handle.
    #[must_use]
    pub fn spawn(registry: Arc<ChannelRegistry>) -> (DispatchQueue, JoinHandle<()>) {
        let (queue, receiver) = DispatchQueue::new();
        let handle = tokio::spawn(Self::new(registry, receiver).run());
        (queue, handle)
    }

    /// Drains the queue until every [`DispatchQueue`] handle is dropped.
    pub async fn run(mut self) {
        tracing::info!("dispatcher started");
        while let Some(message) = self.receiver.recv().await {
            let fan_out = dispatch(&self.registry, &message).await;
            tracing::debug!(
                channel = %message.chat_id,
                delivered = fan_out.delivered,
                evicted = fan_out.evicted,
                "message dispatched"
            );
        }
        tracing::info!("dispatch queue closed, dispatcher stopping");
    }
}

/// Sends `message` to every current subscriber of its channel.
///
/// A subscriber whose send fails is unsubscribed and closed; delivery to
/// the remaining subscribers continues. A channel without subscribers is a
/// no-op.
pub async fn dispatch(registry: &ChannelRegistry, message: &ChatMessage) -> FanOut {
    let mut fan_out = FanOut::default();
    for connection in registry.snapshot(&message.chat_id).await {
        match connection.send(message).await {
            Ok(()) => fan_out.delivered += 1,
            Err(e) => {
                tracing::warn!(
                    connection_id = %connection.id(),
                    channel = %message.chat_id,
                    error = %e,
                    "client write error, evicting"
                );
                registry.unsubscribe(&message.chat_id, connection.id()).await;
                connection.close().await;
                fan_out.evicted += 1;
            }
        }
    }
    fan_out
}
