use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use quizroom::websockets::ConnectionManager;

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Records every message per connection id instead of writing to sockets
#[derive(Clone, Default)]
pub struct MockConnectionManager {
    sent_messages: Arc<RwLock<HashMap<String, VecDeque<String>>>>,
    connected: Arc<RwLock<HashSet<String>>>,
    groups: Arc<RwLock<HashMap<String, HashSet<String>>>>,
}

impl MockConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_connected_player(&self, connection_id: &str) {
        self.connected
            .write()
            .await
            .insert(connection_id.to_string());
    }

    pub async fn get_messages_for(&self, connection_id: &str) -> Vec<String> {
        self.sent_messages
            .read()
            .await
            .get(connection_id)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Pops the oldest message recorded for a connection
    pub async fn consume_message_for(&self, connection_id: &str) -> Option<String> {
        self.sent_messages
            .write()
            .await
            .get_mut(connection_id)
            .and_then(|queue| queue.pop_front())
    }

    pub async fn group_members(&self, group: &str) -> Vec<String> {
        let groups = self.groups.read().await;
        let mut members: Vec<String> = groups
            .get(group)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    pub async fn is_connected(&self, connection_id: &str) -> bool {
        self.connected.read().await.contains(connection_id)
    }

    pub async fn clear_messages(&self) {
        self.sent_messages.write().await.clear();
    }

    async fn record(&self, connection_id: &str, message: &str) {
        self.sent_messages
            .write()
            .await
            .entry(connection_id.to_string())
            .or_default()
            .push_back(message.to_string());
    }
}

#[async_trait]
impl ConnectionManager for MockConnectionManager {
    async fn add_connection(&self, connection_id: String, _sender: mpsc::UnboundedSender<String>) {
        self.add_connected_player(&connection_id).await;
    }

    async fn remove_connection(&self, connection_id: &str) {
        self.connected.write().await.remove(connection_id);
        for members in self.groups.write().await.values_mut() {
            members.remove(connection_id);
        }
    }

    async fn add_to_group(&self, connection_id: &str, group: &str) {
        self.groups
            .write()
            .await
            .entry(group.to_string())
            .or_default()
            .insert(connection_id.to_string());
    }

    async fn remove_from_group(&self, connection_id: &str, group: &str) {
        if let Some(members) = self.groups.write().await.get_mut(group) {
            members.remove(connection_id);
        }
    }

    async fn send_to_connection(&self, connection_id: &str, message: &str) {
        self.record(connection_id, message).await;
    }

    async fn send_to_group(&self, group: &str, message: &str) {
        for member in self.group_members(group).await {
            self.record(&member, message).await;
        }
    }

    async fn send_to_all(&self, message: &str) {
        let connected: Vec<String> = self.connected.read().await.iter().cloned().collect();
        for connection_id in connected {
            self.record(&connection_id, message).await;
        }
    }
}
