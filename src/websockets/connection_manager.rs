use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Delivery gateway between game logic and live client connections.
///
/// Sends only push onto unbounded channels, so no method waits on a slow client.
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    async fn add_connection(&self, connection_id: String, sender: mpsc::UnboundedSender<String>);

    /// Drops the connection and its membership in every group
    async fn remove_connection(&self, connection_id: &str);

    async fn add_to_group(&self, connection_id: &str, group: &str);

    async fn remove_from_group(&self, connection_id: &str, group: &str);

    async fn send_to_connection(&self, connection_id: &str, message: &str);

    async fn send_to_group(&self, group: &str, message: &str);

    async fn send_to_all(&self, message: &str);
}

#[derive(Default)]
pub struct InMemoryConnectionManager {
    // connection_id -> sender
    connections: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<String>>>>,
    // group -> connection ids
    groups: Arc<RwLock<HashMap<String, HashSet<String>>>>,
}

impl InMemoryConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            groups: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
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
}

fn deliver(sender: &mpsc::UnboundedSender<String>, connection_id: &str, message: &str) {
    if sender.send(message.to_string()).is_err() {
        debug!(connection_id = %connection_id, "Dropping message for closed connection");
    }
}

#[async_trait]
impl ConnectionManager for InMemoryConnectionManager {
    async fn add_connection(&self, connection_id: String, sender: mpsc::UnboundedSender<String>) {
        let mut connections = self.connections.write().await;
        connections.insert(connection_id, sender);
    }

    async fn remove_connection(&self, connection_id: &str) {
        {
            let mut connections = self.connections.write().await;
            connections.remove(connection_id);
        }

        let mut groups = self.groups.write().await;
        for members in groups.values_mut() {
            members.remove(connection_id);
        }
        groups.retain(|_, members| !members.is_empty());
    }

    async fn add_to_group(&self, connection_id: &str, group: &str) {
        let mut groups = self.groups.write().await;
        groups
            .entry(group.to_string())
            .or_default()
            .insert(connection_id.to_string());
    }

    async fn remove_from_group(&self, connection_id: &str, group: &str) {
        let mut groups = self.groups.write().await;
        if let Some(members) = groups.get_mut(group) {
            members.remove(connection_id);
            if members.is_empty() {
                groups.remove(group);
            }
        }
    }

    async fn send_to_connection(&self, connection_id: &str, message: &str) {
        let connections = self.connections.read().await;
        if let Some(sender) = connections.get(connection_id) {
            deliver(sender, connection_id, message);
        }
    }

    async fn send_to_group(&self, group: &str, message: &str) {
        let members: Vec<String> = {
            let groups = self.groups.read().await;
            match groups.get(group) {
                Some(members) => members.iter().cloned().collect(),
                None => return,
            }
        };

        let connections = self.connections.read().await;
        for connection_id in members {
            if let Some(sender) = connections.get(&connection_id) {
                deliver(sender, &connection_id, message);
            }
        }
    }

    async fn send_to_all(&self, message: &str) {
        let connections = self.connections.read().await;
        for (connection_id, sender) in connections.iter() {
            deliver(sender, connection_id, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connect(
        manager: &InMemoryConnectionManager,
        connection_id: &str,
    ) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        manager.add_connection(connection_id.to_string(), tx).await;
        rx
    }

    #[tokio::test]
    async fn test_group_send_reaches_members_only() {
        let manager = InMemoryConnectionManager::new();
        let mut a = connect(&manager, "a").await;
        let mut b = connect(&manager, "b").await;

        manager.add_to_group("a", "room-1").await;
        manager.send_to_group("room-1", "hello").await;

        assert_eq!(a.try_recv().unwrap(), "hello");
        assert!(b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remove_connection_leaves_groups() {
        let manager = InMemoryConnectionManager::new();
        let _a = connect(&manager, "a").await;
        let _b = connect(&manager, "b").await;
        manager.add_to_group("a", "room-1").await;
        manager.add_to_group("b", "room-1").await;

        manager.remove_connection("a").await;

        assert_eq!(manager.group_members("room-1").await, vec!["b".to_string()]);
        assert_eq!(manager.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_send_to_closed_connection_does_not_fail() {
        let manager = InMemoryConnectionManager::new();
        let rx = connect(&manager, "a").await;
        drop(rx);

        manager.send_to_connection("a", "lost").await;
        manager.send_to_all("lost").await;
        manager.send_to_connection("missing", "lost").await;
    }

    #[tokio::test]
    async fn test_send_to_all() {
        let manager = InMemoryConnectionManager::new();
        let mut a = connect(&manager, "a").await;
        let mut b = connect(&manager, "b").await;

        manager.send_to_all("everyone").await;

        assert_eq!(a.try_recv().unwrap(), "everyone");
        assert_eq!(b.try_recv().unwrap(), "everyone");
    }
}
