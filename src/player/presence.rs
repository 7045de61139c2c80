use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::models::Player;
use crate::game::{is_reserved_room_id, RoomRegistry};
use crate::websockets::{ConnectionManager, WebSocketMessage};

/// Process wide list of connected players and the room each one is in.
///
/// The list lock only guards the list and is never held across room side
/// effects. Side effects on one room are ordered by that room's own lock, so a
/// slow room never holds up joins and leaves elsewhere.
pub struct PresenceTracker {
    connected: Mutex<Vec<Player>>,
    // room id -> lock ordering that room's session changes
    room_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    registry: Arc<RoomRegistry>,
    connection_manager: Arc<dyn ConnectionManager>,
}

impl PresenceTracker {
    pub fn new(registry: Arc<RoomRegistry>, connection_manager: Arc<dyn ConnectionManager>) -> Self {
        Self {
            connected: Mutex::new(Vec::new()),
            room_locks: Mutex::new(HashMap::new()),
            registry,
            connection_manager,
        }
    }

    /// Inserts or replaces the entry for the player's connection.
    ///
    /// Moving to another room leaves the old one first; an emptied room has its
    /// session disposed. Joining a room starts its game, or queues the player when
    /// a game is already running. The room id doubles as the topic id.
    #[instrument(skip(self, player), fields(username = %player.username, room_id = ?player.room_id))]
    pub async fn upsert(&self, player: Player) {
        let Some(connection_id) = player.connection_id.clone() else {
            warn!("Ignoring presence update without a connection id");
            return;
        };
        if player.room_id.as_deref().is_some_and(is_reserved_room_id) {
            warn!(connection_id = %connection_id, "Ignoring join to a reserved room id");
            return;
        }

        let previous = {
            let mut connected = self.connected.lock().await;
            let position = connected.iter().position(|p| p.has_connection(&connection_id));

            if let Some(position) = position {
                if connected[position].room_id == player.room_id {
                    // same room, only refresh the entry
                    connected[position] = player;
                    drop(connected);
                    self.broadcast_connected().await;
                    return;
                }
            }

            let previous = position.map(|position| connected.remove(position));
            connected.push(player.clone());
            previous
        };

        if let Some(previous) = previous {
            self.leave_room(&previous).await;
        }
        if let Some(room_id) = player.room_id.as_deref() {
            self.join_room(&connection_id, room_id).await;
        }

        self.broadcast_connected().await;
    }

    /// Removes the entry for `connection_id`, leaving its room if it had one
    #[instrument(skip(self))]
    pub async fn remove(&self, connection_id: &str) -> Option<Player> {
        let removed = {
            let mut connected = self.connected.lock().await;
            let position = connected.iter().position(|p| p.has_connection(connection_id))?;
            connected.remove(position)
        };

        self.leave_room(&removed).await;
        self.broadcast_connected().await;

        debug!(connection_id = %connection_id, "Player removed from presence");
        Some(removed)
    }

    pub async fn connected_players(&self) -> Vec<Player> {
        self.connected.lock().await.clone()
    }

    pub async fn player(&self, connection_id: &str) -> Option<Player> {
        let connected = self.connected.lock().await;
        connected
            .iter()
            .find(|p| p.has_connection(connection_id))
            .cloned()
    }

    pub async fn room_of(&self, connection_id: &str) -> Option<String> {
        self.player(connection_id).await.and_then(|p| p.room_id)
    }

    async fn members_of(&self, room_id: &str) -> Vec<Player> {
        let connected = self.connected.lock().await;
        connected
            .iter()
            .filter(|p| p.is_in_room(room_id))
            .cloned()
            .collect()
    }

    async fn join_room(&self, connection_id: &str, room_id: &str) {
        let lock = self.room_lock(room_id).await;
        {
            let _room = lock.lock().await;

            // the list is re-read under the room lock; the player may have moved on already
            let group = self.members_of(room_id).await;
            if !group.iter().any(|p| p.has_connection(connection_id)) {
                debug!(connection_id = %connection_id, room_id = %room_id, "Player left before joining");
            } else {
                self.connection_manager
                    .add_to_group(connection_id, room_id)
                    .await;

                let (session, started) = self.registry.get_or_create(room_id).await;
                if started {
                    session.add_latecomers(group).await;
                } else {
                    session.start(group, room_id).await;
                }
                info!(connection_id = %connection_id, room_id = %room_id, "Player joined room");
            }
        }
        self.release_room_lock(room_id, lock).await;
    }

    async fn leave_room(&self, previous: &Player) {
        let (Some(room_id), Some(connection_id)) =
            (previous.room_id.as_deref(), previous.connection_id.as_deref())
        else {
            return;
        };

        let lock = self.room_lock(room_id).await;
        {
            let _room = lock.lock().await;

            self.connection_manager
                .remove_from_group(connection_id, room_id)
                .await;

            if self.members_of(room_id).await.is_empty() {
                self.registry.dispose(room_id).await;
                info!(room_id = %room_id, "Last player left room");
            } else if let Some(session) = self.registry.get(room_id).await {
                session.remove_player(connection_id).await;
            }
        }
        self.release_room_lock(room_id, lock).await;
    }

    async fn room_lock(&self, room_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.room_locks.lock().await;
        Arc::clone(locks.entry(room_id.to_string()).or_default())
    }

    async fn release_room_lock(&self, room_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.room_locks.lock().await;
        // clones are only handed out under the map lock, so two owners means the map and us
        if Arc::strong_count(&lock) == 2 {
            locks.remove(room_id);
        }
    }

    async fn broadcast_connected(&self) {
        let connected = self.connected_players().await;
        if let Some(message) = WebSocketMessage::update_connected_users(connected).to_json() {
            self.connection_manager.send_to_all(&message).await;
        }
    }
}
