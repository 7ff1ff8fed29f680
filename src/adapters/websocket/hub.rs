//! Per-user fan-out of subscription change notifications.
//!
//! Each user with at least one live WebSocket connection gets a broadcast
//! channel; reconciliation pushes into it and every connection for that
//! user receives the message. Users without connections have no channel,
//! so notifying them is a no-op.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use crate::application::ports::notifier::{ChangeNotifier, SubscriptionChanged};

/// Server-side identifier for one WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry of live connections grouped by user.
///
/// `RwLock` because notifies (reads) far outnumber connects and
/// disconnects (writes), and concurrent notifies to different users
/// should not serialize.
pub struct NotificationHub {
    /// user_id → broadcast sender shared by that user's connections.
    channels: RwLock<HashMap<Uuid, broadcast::Sender<SubscriptionChanged>>>,

    /// connection_id → user_id, for cleanup on disconnect.
    connections: RwLock<HashMap<ConnectionId, Uuid>>,

    channel_capacity: usize,
}

impl NotificationHub {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            connections: RwLock::new(HashMap::new()),
            channel_capacity,
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(16)
    }

    /// Register a connection for a user and get the receiver its socket
    /// task should drain. The user's channel is created on first join.
    pub async fn join(
        &self,
        user_id: Uuid,
        connection_id: ConnectionId,
    ) -> broadcast::Receiver<SubscriptionChanged> {
        // `leave` holds `connections` while acquiring `channels`, so this
        // must never hold `channels` while waiting on `connections`.
        let receiver = {
            let mut channels = self.channels.write().await;
            channels
                .entry(user_id)
                .or_insert_with(|| {
                    let (tx, _) = broadcast::channel(self.channel_capacity);
                    tx
                })
                .subscribe()
        };

        self.connections
            .write()
            .await
            .insert(connection_id, user_id);

        receiver
    }

    /// Drop a connection, removing the user's channel once the last
    /// connection is gone. Liveness is judged from the connections map,
    /// not `receiver_count`: the caller's receiver may still be in scope
    /// when it leaves.
    pub async fn leave(&self, connection_id: &ConnectionId) {
        let mut connections = self.connections.write().await;

        if let Some(user_id) = connections.remove(connection_id) {
            let has_remaining = connections.values().any(|u| *u == user_id);
            if !has_remaining {
                self.channels.write().await.remove(&user_id);
            }
        }
    }

    /// Live connections for one user (0 when the user has none).
    pub async fn connection_count(&self, user_id: Uuid) -> usize {
        self.channels
            .read()
            .await
            .get(&user_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Live connections across all users.
    pub async fn total_connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[async_trait]
impl ChangeNotifier for NotificationHub {
    async fn notify(&self, user_id: Uuid, change: SubscriptionChanged) {
        let channels = self.channels.read().await;
        if let Some(sender) = channels.get(&user_id) {
            // Send errors mean no receivers, which is fine.
            let _ = sender.send(change);
        }
    }
}
