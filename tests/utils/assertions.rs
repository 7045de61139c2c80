//! Test assertion helpers - fluent API for verifying test expectations
#![allow(dead_code)] // Test utilities may not all be used in every test

use quizroom::websockets::{MessageType, WebSocketMessage};

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct MessageAssertion<'a> {
    setup: &'a TestSetup,
    players: Vec<&'a str>, // connection ids
}

impl<'a> MessageAssertion<'a> {
    /// Create an assertion for all players in the setup
    pub fn for_all_players(setup: &'a TestSetup) -> Self {
        let players = setup.players.iter().map(|s| s.as_str()).collect();
        Self { setup, players }
    }

    /// Create an assertion for specific players
    pub fn for_players(setup: &'a TestSetup, players: Vec<&'a str>) -> Self {
        Self { setup, players }
    }

    /// Assert that players received a specific message type next (consumes the message from queue)
    pub async fn received_message_type(self, expected_type: MessageType) -> MessageContent {
        let mut messages = vec![];

        for player in &self.players {
            let message = self
                .setup
                .mock_conn_manager
                .consume_message_for(player)
                .await;
            let message =
                message.unwrap_or_else(|| panic!("{} should have received a message", player));

            let msg: WebSocketMessage = serde_json::from_str(&message).unwrap();
            assert_eq!(
                msg.message_type, expected_type,
                "{} received wrong message type",
                player
            );
            messages.push(msg);
        }

        // Everyone in the same room sees the same snapshot
        if messages.len() > 1 {
            let first_payload = &messages[0].payload;
            for (i, msg) in messages.iter().enumerate().skip(1) {
                assert_eq!(
                    &msg.payload, first_payload,
                    "Player {} payload differs from player {}",
                    self.players[i], self.players[0]
                );
            }
        }

        MessageContent {
            payload: messages[0].payload.clone(),
        }
    }

    /// Assert that players received no messages
    pub async fn received_no_messages(self) {
        for player in &self.players {
            let messages = self.setup.mock_conn_manager.get_messages_for(player).await;
            assert!(
                messages.is_empty(),
                "{} should not have received any messages, got {:?}",
                player,
                messages
            );
        }
    }

    /// Count how many messages of a specific type a player received (non-consuming)
    pub async fn count_message_type(&self, player: &str, msg_type: MessageType) -> usize {
        self.messages_of_type(player, msg_type).await.len()
    }

    /// Payloads of every message of one type a player received, in order (non-consuming)
    pub async fn messages_of_type(&self, player: &str, msg_type: MessageType) -> Vec<MessageContent> {
        let messages = self.setup.mock_conn_manager.get_messages_for(player).await;
        messages
            .iter()
            .filter_map(|msg_str| serde_json::from_str::<WebSocketMessage>(msg_str).ok())
            .filter(|msg| msg.message_type == msg_type)
            .map(|msg| MessageContent {
                payload: msg.payload,
            })
            .collect()
    }

    /// Latest message of one type a player received (non-consuming)
    pub async fn last_of_type(&self, player: &str, msg_type: MessageType) -> MessageContent {
        self.messages_of_type(player, msg_type.clone())
            .await
            .pop()
            .unwrap_or_else(|| panic!("{} received no {:?} message", player, msg_type))
    }
}

// ============================================================================
// Message Content Assertions
// ============================================================================

pub struct MessageContent {
    pub payload: serde_json::Value,
}

impl MessageContent {
    /// Assert the message has a specific sender
    pub fn with_sender(self, expected_sender: &str) -> Self {
        assert_eq!(self.payload["sender"], expected_sender);
        self
    }

    /// Assert the message has specific content
    pub fn with_content(self, expected_content: &str) -> Self {
        assert_eq!(self.payload["content"], expected_content);
        self
    }

    /// Assert an answer acknowledgement
    pub fn with_ack(self, choice_id: u32, accepted: bool) -> Self {
        assert_eq!(self.payload["choice_id"], choice_id);
        assert_eq!(self.payload["accepted"], accepted);
        self
    }

    /// Assert a game snapshot's started flag
    pub fn with_game_started(self, started: bool) -> Self {
        assert_eq!(self.payload["game_started"], started);
        self
    }

    /// Assert a game snapshot's phase
    pub fn with_phase(self, phase: &str) -> Self {
        assert_eq!(self.payload["phase"], phase);
        self
    }

    /// Assert a game snapshot's round position
    pub fn with_round(self, round_number: u64, rounds: u64) -> Self {
        assert_eq!(self.payload["round_number"], round_number);
        assert_eq!(self.payload["rounds"], rounds);
        self
    }

    /// Assert the score of one player in a game snapshot
    pub fn with_score(self, username: &str, expected: u64) -> Self {
        let players = self.payload["players"]
            .as_array()
            .expect("snapshot should list players");
        let player = players
            .iter()
            .find(|p| p["username"] == username)
            .unwrap_or_else(|| panic!("{} missing from snapshot", username));
        assert_eq!(player["score"], expected, "score of {}", username);
        self
    }

    /// Usernames listed in the payload's `players` array
    pub fn usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.payload["players"]
            .as_array()
            .map(|players| {
                players
                    .iter()
                    .filter_map(|p| p["username"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
