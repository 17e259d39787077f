//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::StreamExt;

use super::ingress::IngressHandler;
use crate::app_state::AppState;
use crate::domain::{ChannelId, ChannelRegistry, Connection, DispatchQueue};

/// `GET /message-slot/{id}` — Upgrade to WebSocket and attach to channel `id`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(chat_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let channel = ChannelId::from(chat_id);
    let registry = Arc::clone(&state.registry);
    let queue = state.queue.clone();

    ws.on_upgrade(move |socket| attach(socket, channel, registry, queue))
}

/// Registers a freshly upgraded socket under `channel` and runs its read
/// loop until the session ends.
pub async fn attach(
    socket: WebSocket,
    channel: ChannelId,
    registry: Arc<ChannelRegistry>,
    queue: DispatchQueue,
) {
    let (ws_tx, ws_rx) = socket.split();
    let connection = Arc::new(Connection::new(Box::pin(ws_tx)));
    tracing::debug!(
        connection_id = %connection.id(),
        channel = %channel,
        "client attached"
    );

    registry.subscribe(&channel, Arc::clone(&connection)).await;
    IngressHandler::new(channel, connection, registry, queue)
        .run(ws_rx)
        .await;
}
