//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::{ChannelRegistry, DispatchQueue};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Channel membership shared by every session and the dispatcher.
    pub registry: Arc<ChannelRegistry>,
    /// Producer end of the dispatch queue.
    pub queue: DispatchQueue,
}
