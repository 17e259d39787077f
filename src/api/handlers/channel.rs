//! Channel introspection endpoints.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::app_state::AppState;
use crate::domain::ChannelId;

/// One channel and how many clients are attached to it.
#[derive(Debug, Serialize)]
pub struct ChannelSummary {
    /// Channel name.
    pub chat_id: ChannelId,
    /// Number of attached connections.
    pub subscribers: usize,
}

/// Response body for `GET /api/v1/channels`.
#[derive(Debug, Serialize)]
pub struct ChannelListResponse {
    /// Active channels sorted by name.
    pub channels: Vec<ChannelSummary>,
    /// Number of active channels.
    pub channel_count: usize,
    /// Number of attached connections across all channels.
    pub connection_count: usize,
}

/// `GET /api/v1/channels` — List active channels with subscriber counts.
pub async fn list_channels(State(state): State<AppState>) -> Json<ChannelListResponse> {
    let channels: Vec<ChannelSummary> = state
        .registry
        .channels()
        .await
        .into_iter()
        .map(|(chat_id, subscribers)| ChannelSummary {
            chat_id,
            subscribers,
        })
        .collect();
    let connection_count = channels.iter().map(|c| c.subscribers).sum();

    Json(ChannelListResponse {
        channel_count: channels.len(),
        connection_count,
        channels,
    })
}

/// Channel routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/channels", get(list_channels))
}
