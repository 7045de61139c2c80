#![allow(dead_code)] // Test utilities may not all be used in every test

use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::{sleep, Duration};

use quizroom::{
    game::{single_player_key, GameSession},
    websockets::{ConnectionContext, MessageHandler, WebsocketReceiveHandler},
};

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Send a raw frame as if it came from the player's socket
    pub async fn send_raw(&self, player: &str, frame: &str) {
        let handler = self
            .handlers
            .get(player)
            .unwrap_or_else(|| panic!("{} is not connected", player));
        handler.handle_message(player, frame.to_string()).await;
    }

    /// Send a typed envelope from the player
    pub async fn send_message(&self, player: &str, message_type: &str, payload: Value) {
        let frame = json!({ "type": message_type, "payload": payload }).to_string();
        self.send_raw(player, &frame).await;
    }

    /// Let the round clock run for `ticks` periods plus a small margin
    pub async fn wait_ticks(&self, ticks: u64) {
        sleep(Duration::from_millis(ticks * 1000 + 500)).await;
    }

    /// Clear all recorded messages
    pub async fn clear_messages(&self) {
        self.mock_conn_manager.clear_messages().await;
    }

    /// Connect another player after setup
    pub async fn connect(&mut self, player: &str) {
        self.mock_conn_manager.add_connected_player(player).await;
        let context = ConnectionContext {
            connection_id: player.to_string(),
            username: player.to_string(),
            user_id: Some(format!("user-{}", player)),
        };
        let handler = Arc::new(WebsocketReceiveHandler::new(context, &self.app_state));
        handler.handle_connect().await;
        self.handlers.insert(player.to_string(), handler);
        self.players.push(player.to_string());
    }

    /// Drop the player's connection and run the disconnect cleanup
    pub async fn disconnect(&mut self, player: &str) {
        if let Some(handler) = self.handlers.remove(player) {
            handler.handle_disconnect().await;
        }
        self.players.retain(|p| p != player);
    }

    pub async fn session(&self, key: &str) -> Option<Arc<GameSession>> {
        self.app_state.registry.get(key).await
    }

    /// The player's private game, if one is running
    pub async fn single_player_session(&self, player: &str) -> Option<Arc<GameSession>> {
        self.session(&single_player_key(player)).await
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    pub async fn join_room(&self, player: &str, room_id: &str) {
        self.send_message(player, "JOIN_ROOM", json!({ "room_id": room_id }))
            .await;
    }

    pub async fn leave_room(&self, player: &str) {
        self.send_message(player, "LEAVE_ROOM", Value::Null).await;
    }

    pub async fn submit_answer(&self, player: &str, choice_id: u32) {
        self.send_message(player, "SUBMIT_ANSWER", json!({ "choice_id": choice_id }))
            .await;
    }

    pub async fn send_chat(&self, player: &str, content: &str) {
        self.send_message(player, "CHAT", json!({ "content": content }))
            .await;
    }

    pub async fn start_single_player(&self, player: &str, topic_id: &str) {
        self.send_message(player, "START_SINGLE_PLAYER", json!({ "topic_id": topic_id }))
            .await;
    }

    pub async fn stop_game(&self, player: &str, payload: Value) {
        self.send_message(player, "STOP_GAME", payload).await;
    }
}
