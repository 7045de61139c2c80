use serde::{Deserialize, Serialize};

/// A participant as seen by the presence tracker and by game sessions.
///
/// `connection_id` is ephemeral and changes on reconnect; `user_id` is the durable
/// identity used for stats. A player without a connection id is never delivered to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub connection_id: Option<String>,
    pub user_id: Option<String>,
    pub room_id: Option<String>,
    pub username: String,
    pub score: u32,
    pub selected_choice: Option<u32>,
    pub playing_single_mode: bool,
}

impl Player {
    pub fn new(connection_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            connection_id: Some(connection_id.into()),
            user_id: None,
            room_id: None,
            username: username.into(),
            score: 0,
            selected_choice: None,
            playing_single_mode: false,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn in_room(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    pub fn has_connection(&self, connection_id: &str) -> bool {
        self.connection_id.as_deref() == Some(connection_id)
    }

    pub fn is_in_room(&self, room_id: &str) -> bool {
        self.room_id.as_deref() == Some(room_id)
    }

    /// Clears per-game progress ahead of a new game
    pub fn reset_progress(&mut self) {
        self.score = 0;
        self.selected_choice = None;
    }
}
