//! Per-connection read loop.
//!
//! An [`IngressHandler`] owns the read half of one client's WebSocket. It
//! stamps each inbound payload with the connection's channel and hands it
//! to the dispatch queue. Any read failure ends the session: the
//! connection leaves its channel and its transport is closed.

use std::sync::Arc;

use axum::extract::ws::Message;
use chrono::Utc;
use futures_util::{Stream, StreamExt};

use super::messages::InboundMessage;
use crate::domain::{ChannelId, ChannelRegistry, ChatMessage, Connection, DispatchQueue};
use crate::error::RelayError;

/// Reads one client's frames and publishes them on its channel.
#[derive(Debug)]
pub struct IngressHandler {
    channel: ChannelId,
    connection: Arc<Connection>,
    registry: Arc<ChannelRegistry>,
    queue: DispatchQueue,
}

impl IngressHandler {
    /// Creates a handler for a connection already subscribed to `channel`.
    #[must_use]
    pub fn new(
        channel: ChannelId,
        connection: Arc<Connection>,
        registry: Arc<ChannelRegistry>,
        queue: DispatchQueue,
    ) -> Self {
        Self {
            channel,
            connection,
            registry,
            queue,
        }
    }

    /// Runs until the client disconnects or misbehaves, then evicts it.
    pub async fn run<S>(self, mut inbound: S)
    where
        S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    {
        let outcome = loop {
            let frame = match inbound.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => break Err(RelayError::Transport(e)),
                None => break Ok(()),
            };
            let decoded = match frame {
                Message::Text(text) => InboundMessage::decode(text.as_str().as_bytes()),
                Message::Binary(bytes) => InboundMessage::decode(&bytes),
                Message::Ping(_) | Message::Pong(_) => continue,
                Message::Close(_) => break Ok(()),
            };
            let published = decoded.and_then(|payload| {
                self.queue
                    .publish(ChatMessage::stamp(self.channel.clone(), payload.message))
            });
            if let Err(e) = published {
                break Err(e);
            }
        };

        match &outcome {
            Ok(()) => tracing::debug!(
                connection_id = %self.connection.id(),
                channel = %self.channel,
                session_secs = (Utc::now() - self.connection.connected_at()).num_seconds(),
                "client disconnected"
            ),
            Err(e) if e.is_disconnect() => tracing::debug!(
                connection_id = %self.connection.id(),
                channel = %self.channel,
                error = %e,
                "client read error"
            ),
            Err(e) => tracing::warn!(
                connection_id = %self.connection.id(),
                channel = %self.channel,
                error = %e,
                "dropping client"
            ),
        }

        self.registry
            .unsubscribe(&self.channel, self.connection.id())
            .await;
        self.connection.close().await;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use futures_util::stream;
    use tokio::sync::mpsc;

    use super::*;
    use crate::domain::connection::test_support::channel_connection;

    type Frame = Result<Message, axum::Error>;

    struct Harness {
        registry: Arc<ChannelRegistry>,
        connection: Arc<Connection>,
        queue_rx: mpsc::UnboundedReceiver<ChatMessage>,
        handler: IngressHandler,
    }

    async fn harness(channel: &str) -> Harness {
        let registry = Arc::new(ChannelRegistry::new());
        let (queue, queue_rx) = DispatchQueue::new();
        let (connection, _rx) = channel_connection();
        let channel = ChannelId::from(channel);
        registry.subscribe(&channel, Arc::clone(&connection)).await;
        let handler = IngressHandler::new(
            channel,
            Arc::clone(&connection),
            Arc::clone(&registry),
            queue,
        );
        Harness {
            registry,
            connection,
            queue_rx,
            handler,
        }
    }

    #[tokio::test]
    async fn stamps_and_publishes_payloads() {
        let mut h = harness("room1").await;
        let frames: Vec<Frame> = vec![
            Ok(Message::text(r#"{"message":"hi","chat_id":"spoofed","timestamp":1}"#)),
            Ok(Message::Ping(Vec::new().into())),
            Ok(Message::Binary(br#"{"message":"bin"}"#.to_vec().into())),
        ];
        h.handler.run(stream::iter(frames)).await;

        let Some(first) = h.queue_rx.recv().await else {
            panic!("expected first message");
        };
        assert_eq!(first.chat_id, ChannelId::from("room1"));
        assert_eq!(first.message, "hi");
        assert!(first.timestamp > 1);

        let Some(second) = h.queue_rx.recv().await else {
            panic!("expected second message");
        };
        assert_eq!(second.message, "bin");
    }

    #[tokio::test]
    async fn end_of_stream_evicts_connection() {
        let h = harness("room1").await;
        h.handler.run(stream::iter(Vec::<Frame>::new())).await;

        assert_eq!(h.registry.subscriber_count(&ChannelId::from("room1")).await, 0);
        assert!(h.connection.is_closed().await);
    }

    #[tokio::test]
    async fn malformed_payload_evicts_and_stops_reading() {
        let mut h = harness("room1").await;
        let frames: Vec<Frame> = vec![
            Ok(Message::text("not json")),
            Ok(Message::text(r#"{"message":"never sent"}"#)),
        ];
        h.handler.run(stream::iter(frames)).await;

        assert!(h.queue_rx.try_recv().is_err());
        assert_eq!(h.registry.channel_count().await, 0);
        assert!(h.connection.is_closed().await);
    }

    #[tokio::test]
    async fn transport_error_evicts() {
        let h = harness("room1").await;
        let frames: Vec<Frame> = vec![Err(axum::Error::new(std::io::Error::other("reset")))];
        h.handler.run(stream::iter(frames)).await;

        assert_eq!(h.registry.connection_count().await, 0);
        assert!(h.connection.is_closed().await);
    }

    #[tokio::test]
    async fn close_frame_ends_session() {
        let mut h = harness("room1").await;
        let frames: Vec<Frame> = vec![
            Ok(Message::Close(None)),
            Ok(Message::text(r#"{"message":"after close"}"#)),
        ];
        h.handler.run(stream::iter(frames)).await;

        assert!(h.queue_rx.try_recv().is_err());
        assert!(h.connection.is_closed().await);
    }

    #[tokio::test]
    async fn stopped_dispatcher_evicts() {
        let h = harness("room1").await;
        let Harness {
            registry,
            connection,
            queue_rx,
            handler,
        } = h;
        drop(queue_rx);

        let frames: Vec<Frame> = vec![Ok(Message::text(r#"{"message":"hi"}"#))];
        let run = handler.run(stream::iter(frames));
        let Ok(()) = tokio::time::timeout(Duration::from_secs(2), run).await else {
            panic!("handler did not terminate");
        };
        assert_eq!(registry.connection_count().await, 0);
        assert!(connection.is_closed().await);
    }
}
