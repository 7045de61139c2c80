use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::game::GameView;
use crate::player::Player;

/// Message types for WebSocket communication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    // Client -> Server
    JoinRoom,
    LeaveRoom,
    SubmitAnswer,
    StartSinglePlayer,
    StopGame,
    Chat,

    // Server -> Client
    Connected,
    UpdateGame,
    UpdateConnectedUsers,
    AnswerSubmissionAck,
    GroupMessage,
    Error,
}

/// Metadata for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessageMeta {
    pub timestamp: DateTime<Utc>,
    pub connection_id: Option<String>,
}

/// Base structure for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub meta: Option<WebSocketMessageMeta>,
}

/// Client-to-Server message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomPayload {
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswerPayload {
    pub choice_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSinglePlayerPayload {
    pub topic_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopGamePayload {
    /// Defaults to the sender's current room
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub single_player: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPayload {
    pub content: String,
}

/// Server-to-Client message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedPayload {
    pub connection_id: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedUsersPayload {
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSubmissionAckPayload {
    pub choice_id: u32,
    pub accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMessagePayload {
    pub sender: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Helper functions for creating messages
impl WebSocketMessage {
    pub fn new(message_type: MessageType, payload: serde_json::Value) -> Self {
        Self {
            message_type,
            payload,
            meta: Some(WebSocketMessageMeta {
                timestamp: Utc::now(),
                connection_id: None,
            }),
        }
    }

    fn with_payload<T: Serialize>(message_type: MessageType, payload: &T) -> Self {
        let value = serde_json::to_value(payload).unwrap_or_else(|e| {
            error!(message_type = ?message_type, error = %e, "Failed to serialize payload");
            serde_json::Value::Null
        });
        Self::new(message_type, value)
    }

    /// Serializes the envelope for the wire
    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(e) => {
                error!(message_type = ?self.message_type, error = %e, "Failed to serialize message");
                None
            }
        }
    }

    /// Create a CONNECTED message
    pub fn connected(connection_id: String, username: String) -> Self {
        let payload = ConnectedPayload {
            connection_id: connection_id.clone(),
            username,
        };
        let mut message = Self::with_payload(MessageType::Connected, &payload);
        if let Some(meta) = message.meta.as_mut() {
            meta.connection_id = Some(connection_id);
        }
        message
    }

    /// Create an UPDATE_GAME message
    pub fn update_game(view: &GameView) -> Self {
        Self::with_payload(MessageType::UpdateGame, view)
    }

    /// Create an UPDATE_CONNECTED_USERS message
    pub fn update_connected_users(players: Vec<Player>) -> Self {
        Self::with_payload(
            MessageType::UpdateConnectedUsers,
            &ConnectedUsersPayload { players },
        )
    }

    /// Create an ANSWER_SUBMISSION_ACK message
    pub fn answer_submission_ack(choice_id: u32, accepted: bool) -> Self {
        Self::with_payload(
            MessageType::AnswerSubmissionAck,
            &AnswerSubmissionAckPayload {
                choice_id,
                accepted,
            },
        )
    }

    /// Create a GROUP_MESSAGE message
    pub fn group_message(sender: String, content: String) -> Self {
        Self::with_payload(
            MessageType::GroupMessage,
            &GroupMessagePayload { sender, content },
        )
    }

    /// Create an ERROR message
    pub fn error(message: String) -> Self {
        Self::with_payload(MessageType::Error, &ErrorPayload { message })
    }
}
