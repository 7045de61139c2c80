use futures::FutureExt;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use super::session::GameSession;
use super::state::Phase;
use crate::config::GameConfig;
use crate::quiz::QuizProvider;
use crate::stats::StatsSink;
use crate::websockets::ConnectionManager;

type SessionMap = Arc<RwLock<HashMap<String, Arc<GameSession>>>>;

const SINGLE_PLAYER_PREFIX: &str = "single:";

/// Registry key of a connection's private game.
///
/// Private keys live under a prefix that room ids may not use, so joining a room
/// can never reach someone else's single player session.
pub fn single_player_key(connection_id: &str) -> String {
    format!("{}{}", SINGLE_PLAYER_PREFIX, connection_id)
}

/// Whether `room_id` falls in the namespace kept for single player sessions
pub fn is_reserved_room_id(room_id: &str) -> bool {
    room_id.starts_with(SINGLE_PLAYER_PREFIX)
}

/// Listing entry for `GET /rooms`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub game_started: bool,
    pub phase: Phase,
    pub players: usize,
}

/// Keeps at most one live session per room key
pub struct RoomRegistry {
    // room key -> session
    sessions: SessionMap,
    config: GameConfig,
    quiz_provider: Arc<dyn QuizProvider>,
    stats_sink: Arc<dyn StatsSink>,
    connection_manager: Arc<dyn ConnectionManager>,
}

impl RoomRegistry {
    pub fn new(
        config: GameConfig,
        quiz_provider: Arc<dyn QuizProvider>,
        stats_sink: Arc<dyn StatsSink>,
        connection_manager: Arc<dyn ConnectionManager>,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
            quiz_provider,
            stats_sink,
            connection_manager,
        }
    }

    /// Returns the session for `room_id`, creating it when absent, together with
    /// whether a game is already running in it.
    #[instrument(skip(self))]
    pub async fn get_or_create(&self, room_id: &str) -> (Arc<GameSession>, bool) {
        let existing = {
            let sessions = self.sessions.read().await;
            sessions.get(room_id).cloned()
        };

        let session = match existing {
            Some(session) => session,
            None => {
                let mut sessions = self.sessions.write().await;
                sessions
                    .entry(room_id.to_string())
                    .or_insert_with(|| {
                        debug!(room_id = %room_id, "Creating game session");
                        self.build_session(room_id)
                    })
                    .clone()
            }
        };

        let started = session.is_started().await;
        (session, started)
    }

    pub async fn get(&self, room_id: &str) -> Option<Arc<GameSession>> {
        let sessions = self.sessions.read().await;
        sessions.get(room_id).cloned()
    }

    /// Removes the session for `room_id` and ends it
    #[instrument(skip(self))]
    pub async fn dispose(&self, room_id: &str) -> bool {
        let removed = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(room_id)
        };

        match removed {
            Some(session) => {
                session.end().await;
                info!(room_id = %room_id, "Game session disposed");
                true
            }
            None => false,
        }
    }

    pub async fn active_rooms(&self) -> Vec<RoomSummary> {
        let sessions: Vec<Arc<GameSession>> = {
            let sessions = self.sessions.read().await;
            sessions.values().cloned().collect()
        };

        let mut rooms = Vec::with_capacity(sessions.len());
        for session in sessions {
            let view = session.snapshot().await;
            rooms.push(RoomSummary {
                room_id: session.room_id().to_string(),
                game_started: view.game_started,
                phase: view.phase,
                players: session.roster().await.len(),
            });
        }
        rooms.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        rooms
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    fn build_session(&self, room_id: &str) -> Arc<GameSession> {
        let session = GameSession::new(
            room_id,
            self.config.clone(),
            Arc::clone(&self.quiz_provider),
            Arc::clone(&self.stats_sink),
            Arc::clone(&self.connection_manager),
        );

        let sessions = Arc::downgrade(&self.sessions);
        let key = room_id.to_string();
        let instance_id = session.instance_id().to_string();

        // Only evicts the entry if it still belongs to this session instance
        let evict = async move {
            let Some(sessions) = sessions.upgrade() else {
                return;
            };
            let mut sessions = sessions.write().await;
            if sessions
                .get(&key)
                .is_some_and(|s| s.instance_id() == instance_id)
            {
                sessions.remove(&key);
                debug!(room_id = %key, "Evicted ended game session");
            }
        }
        .boxed();

        Arc::new(session.with_end_hook(evict))
    }
}
