//! Concurrent channel membership with per-channel fine-grained locking.
//!
//! [`ChannelRegistry`] maps each channel to the set of connections attached
//! to it. The outer map and each channel's set are guarded by separate
//! [`tokio::sync::RwLock`]s, so membership changes on different channels
//! proceed concurrently while the dispatcher snapshots any of them.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::connection::{Connection, ConnectionId};
use super::ChannelId;

type Members = HashMap<ConnectionId, Arc<Connection>>;

/// Central store of channel subscriptions.
///
/// # Concurrency
///
/// - Locks are always taken outer map first, then the channel's set.
/// - Inserts happen while the outer read lock is held.
/// - Empty channels are pruned under the outer write lock after
///   re-checking emptiness, so a racing subscribe is never lost in a
///   pruned set.
/// - Snapshots copy the member list and release both locks before any
///   send happens.
#[derive(Debug)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<ChannelId, Arc<RwLock<Members>>>>,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a connection to a channel, creating the channel if needed.
    pub async fn subscribe(&self, channel: &ChannelId, connection: Arc<Connection>) {
        {
            let map = self.channels.read().await;
            if let Some(members) = map.get(channel) {
                members.write().await.insert(connection.id(), connection);
                return;
            }
        }

        let mut map = self.channels.write().await;
        let members = map.entry(channel.clone()).or_default();
        members.write().await.insert(connection.id(), connection);
    }

    /// Removes a connection from a channel.
    ///
    /// Returns `true` if this call removed it and `false` if it was already
    /// gone, which happens when ingress and dispatch both detect the same
    /// dead client.
    pub async fn unsubscribe(&self, channel: &ChannelId, connection_id: ConnectionId) -> bool {
        let (removed, emptied) = {
            let map = self.channels.read().await;
            let Some(members) = map.get(channel) else {
                return false;
            };
            let mut members = members.write().await;
            let removed = members.remove(&connection_id).is_some();
            (removed, members.is_empty())
        };

        if emptied {
            self.prune(channel).await;
        }
        removed
    }

    /// Returns the connections subscribed to a channel at this instant.
    ///
    /// An unknown channel yields an empty list.
    pub async fn snapshot(&self, channel: &ChannelId) -> Vec<Arc<Connection>> {
        let map = self.channels.read().await;
        let Some(members) = map.get(channel) else {
            return Vec::new();
        };
        members.read().await.values().map(Arc::clone).collect()
    }

    /// Returns the number of connections subscribed to a channel.
    pub async fn subscriber_count(&self, channel: &ChannelId) -> usize {
        let map = self.channels.read().await;
        match map.get(channel) {
            Some(members) => members.read().await.len(),
            None => 0,
        }
    }

    /// Returns the number of channels with at least one subscriber.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Returns the total number of subscribed connections across channels.
    pub async fn connection_count(&self) -> usize {
        let map = self.channels.read().await;
        let mut total = 0;
        for members in map.values() {
            total += members.read().await.len();
        }
        total
    }

    /// Returns every channel with its subscriber count, sorted by name.
    pub async fn channels(&self) -> Vec<(ChannelId, usize)> {
        let map = self.channels.read().await;
        let mut out = Vec::with_capacity(map.len());
        for (channel, members) in map.iter() {
            out.push((channel.clone(), members.read().await.len()));
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    async fn prune(&self, channel: &ChannelId) {
        let mut map = self.channels.write().await;
        let empty = match map.get(channel) {
            Some(members) => members.read().await.is_empty(),
            None => false,
        };
        if empty {
            map.remove(channel);
            tracing::debug!(channel = %channel, "pruned empty channel");
        }
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::connection::test_support::channel_connection;

    #[tokio::test]
    async fn subscribe_and_snapshot() {
        let registry = ChannelRegistry::new();
        let room = ChannelId::from("room1");
        let (a, _rx_a) = channel_connection();
        let (b, _rx_b) = channel_connection();

        registry.subscribe(&room, Arc::clone(&a)).await;
        registry.subscribe(&room, Arc::clone(&b)).await;

        let snapshot = registry.snapshot(&room).await;
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().any(|c| c.id() == a.id()));
        assert!(snapshot.iter().any(|c| c.id() == b.id()));
    }

    #[tokio::test]
    async fn snapshot_of_unknown_channel_is_empty() {
        let registry = ChannelRegistry::new();
        assert!(registry.snapshot(&ChannelId::from("nobody")).await.is_empty());
        assert_eq!(registry.subscriber_count(&ChannelId::from("nobody")).await, 0);
    }

    #[tokio::test]
    async fn channels_are_isolated() {
        let registry = ChannelRegistry::new();
        let (a, _rx_a) = channel_connection();
        let (b, _rx_b) = channel_connection();
        registry.subscribe(&ChannelId::from("room1"), a).await;
        registry.subscribe(&ChannelId::from("room2"), Arc::clone(&b)).await;

        let room2 = registry.snapshot(&ChannelId::from("room2")).await;
        assert_eq!(room2.len(), 1);
        assert!(room2.iter().all(|c| c.id() == b.id()));
        assert_eq!(registry.channel_count().await, 2);
        assert_eq!(registry.connection_count().await, 2);
    }

    #[tokio::test]
    async fn double_unsubscribe_is_noop() {
        let registry = ChannelRegistry::new();
        let room = ChannelId::from("room1");
        let (a, _rx) = channel_connection();
        let id = a.id();
        registry.subscribe(&room, a).await;

        assert!(registry.unsubscribe(&room, id).await);
        assert!(!registry.unsubscribe(&room, id).await);
        assert!(!registry.unsubscribe(&ChannelId::from("never"), id).await);
    }

    #[tokio::test]
    async fn last_unsubscribe_prunes_channel() {
        let registry = ChannelRegistry::new();
        let room = ChannelId::from("room1");
        let (a, _rx_a) = channel_connection();
        let (b, _rx_b) = channel_connection();
        let (a_id, b_id) = (a.id(), b.id());
        registry.subscribe(&room, a).await;
        registry.subscribe(&room, b).await;

        registry.unsubscribe(&room, a_id).await;
        assert_eq!(registry.channel_count().await, 1);
        registry.unsubscribe(&room, b_id).await;
        assert_eq!(registry.channel_count().await, 0);

        // A pruned channel can be re-created.
        let (c, _rx_c) = channel_connection();
        registry.subscribe(&room, c).await;
        assert_eq!(registry.subscriber_count(&room).await, 1);
    }

    #[tokio::test]
    async fn channels_listing_is_sorted() {
        let registry = ChannelRegistry::new();
        let (a, _rx_a) = channel_connection();
        let (b, _rx_b) = channel_connection();
        let (c, _rx_c) = channel_connection();
        registry.subscribe(&ChannelId::from("zeta"), a).await;
        registry.subscribe(&ChannelId::from("alpha"), b).await;
        registry.subscribe(&ChannelId::from("alpha"), c).await;

        let listing = registry.channels().await;
        assert_eq!(
            listing,
            vec![(ChannelId::from("alpha"), 2), (ChannelId::from("zeta"), 1)]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_churn_leaves_consistent_state() {
        let registry = Arc::new(ChannelRegistry::new());
        let mut handles = Vec::new();
        for i in 0..64 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let room = ChannelId::new(format!("room{}", i % 4));
                let (conn, _rx) = channel_connection();
                let id = conn.id();
                registry.subscribe(&room, conn).await;
                let _ = registry.snapshot(&room).await;
                if i % 2 == 0 {
                    registry.unsubscribe(&room, id).await;
                }
            }));
        }
        for handle in handles {
            assert!(handle.await.is_ok());
        }

        // Odd iterations stayed subscribed: 32 connections, all in odd rooms.
        assert_eq!(registry.connection_count().await, 32);
        assert_eq!(registry.subscriber_count(&ChannelId::from("room1")).await, 16);
        assert_eq!(registry.subscriber_count(&ChannelId::from("room3")).await, 16);
        assert_eq!(registry.subscriber_count(&ChannelId::from("room0")).await, 0);
    }
}
