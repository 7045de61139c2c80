use async_trait::async_trait;
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
};
use serde::{de::DeserializeOwned, Deserialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::game::{is_reserved_room_id, single_player_key, GameView, RoomRegistry};
use crate::player::{Player, PresenceTracker};
use crate::shared::{AppError, AppState};
use crate::websockets::messages::{
    ChatPayload, JoinRoomPayload, MessageType, StartSinglePlayerPayload, StopGamePayload,
    SubmitAnswerPayload, WebSocketMessage,
};
use crate::websockets::ConnectionManager;

use super::socket::{Connection, MessageHandler};

const USERNAME_LENGTH: std::ops::RangeInclusive<usize> = 3..=32;

/// Identity of one client connection
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub connection_id: String,
    pub username: String,
    pub user_id: Option<String>,
}

impl ConnectionContext {
    fn player(&self) -> Player {
        let player = Player::new(self.connection_id.clone(), self.username.clone());
        match &self.user_id {
            Some(user_id) => player.with_user_id(user_id.clone()),
            None => player,
        }
    }
}

/// Routes inbound messages of one connection to presence, sessions and the gateway
pub struct WebsocketReceiveHandler {
    context: ConnectionContext,
    presence: Arc<PresenceTracker>,
    registry: Arc<RoomRegistry>,
    connection_manager: Arc<dyn ConnectionManager>,
    single_player: AtomicBool,
}

impl WebsocketReceiveHandler {
    pub fn new(context: ConnectionContext, app_state: &AppState) -> Self {
        Self {
            context,
            presence: Arc::clone(&app_state.presence),
            registry: Arc::clone(&app_state.registry),
            connection_manager: Arc::clone(&app_state.connection_manager),
            single_player: AtomicBool::new(false),
        }
    }

    pub fn context(&self) -> &ConnectionContext {
        &self.context
    }

    /// Registry key of this connection's single player game
    fn single_player_key(&self) -> String {
        single_player_key(&self.context.connection_id)
    }

    /// Registers the connection as present without a room
    pub async fn handle_connect(&self) {
        let connected =
            WebSocketMessage::connected(self.context.connection_id.clone(), self.context.username.clone());
        self.send(&connected).await;
        self.presence.upsert(self.context.player()).await;
    }

    /// Releases everything the connection held
    #[instrument(skip(self), fields(connection_id = %self.context.connection_id))]
    pub async fn handle_disconnect(&self) {
        self.presence.remove(&self.context.connection_id).await;
        if self.single_player.swap(false, Ordering::SeqCst) {
            self.registry.dispose(&self.single_player_key()).await;
        }
        self.connection_manager
            .remove_connection(&self.context.connection_id)
            .await;
        info!(username = %self.context.username, "Connection cleaned up");
    }

    async fn join_room(&self, payload: JoinRoomPayload) {
        let room_id = payload.room_id.trim();
        if room_id.is_empty() {
            self.send_error("room_id cannot be empty").await;
            return;
        }
        if is_reserved_room_id(room_id) {
            self.send_error("room_id is reserved").await;
            return;
        }
        self.presence
            .upsert(self.context.player().in_room(room_id))
            .await;
    }

    async fn leave_room(&self) {
        self.presence.upsert(self.context.player()).await;
    }

    async fn submit_answer(&self, payload: SubmitAnswerPayload) {
        let key = if self.single_player.load(Ordering::SeqCst) {
            Some(self.single_player_key())
        } else {
            self.presence.room_of(&self.context.connection_id).await
        };

        let accepted = match key {
            Some(key) => match self.registry.get(&key).await {
                Some(session) => {
                    session
                        .submit_answer(&self.context.connection_id, payload.choice_id)
                        .await
                }
                None => false,
            },
            None => false,
        };

        debug!(
            connection_id = %self.context.connection_id,
            choice_id = payload.choice_id,
            accepted = accepted,
            "Answer submitted"
        );
        self.send(&WebSocketMessage::answer_submission_ack(
            payload.choice_id,
            accepted,
        ))
        .await;
    }

    /// Starts a private session keyed by this connection, playing the requested topic
    async fn start_single_player(&self, payload: StartSinglePlayerPayload) {
        // a client is either in a room or playing alone
        if self.presence.room_of(&self.context.connection_id).await.is_some() {
            self.leave_room().await;
        }

        let key = self.single_player_key();
        let (session, started) = self.registry.get_or_create(&key).await;
        if started {
            debug!(session_key = %key, "Single player game already running");
            return;
        }

        let mut player = self.context.player();
        player.playing_single_mode = true;
        self.single_player.store(true, Ordering::SeqCst);

        if !session.start(vec![player], &payload.topic_id).await {
            self.registry.dispose(&key).await;
            self.single_player.store(false, Ordering::SeqCst);
            self.send_error(&format!("No quiz content for topic {}", payload.topic_id))
                .await;
        }
    }

    async fn stop_game(&self, payload: StopGamePayload) {
        let key = if payload.single_player {
            self.single_player.store(false, Ordering::SeqCst);
            Some(self.single_player_key())
        } else {
            match payload.room_id {
                // private games are only stopped by their owner
                Some(room_id) if is_reserved_room_id(&room_id) => {
                    self.send_error("room_id is reserved").await;
                    return;
                }
                Some(room_id) => Some(room_id),
                None => self.presence.room_of(&self.context.connection_id).await,
            }
        };

        let Some(key) = key else {
            self.send_error("Not in a room").await;
            return;
        };

        if self.registry.dispose(&key).await {
            let view = GameView::waiting(&key, 0, Vec::new());
            self.send(&WebSocketMessage::update_game(&view)).await;
        }
    }

    async fn chat(&self, payload: ChatPayload) {
        let Some(room_id) = self.presence.room_of(&self.context.connection_id).await else {
            self.send_error("Join a room before chatting").await;
            return;
        };

        let message = WebSocketMessage::group_message(self.context.username.clone(), payload.content);
        if let Some(json) = message.to_json() {
            self.connection_manager.send_to_group(&room_id, &json).await;
        }
    }

    async fn send(&self, message: &WebSocketMessage) {
        if let Some(json) = message.to_json() {
            self.connection_manager
                .send_to_connection(&self.context.connection_id, &json)
                .await;
        }
    }

    async fn send_error(&self, message: &str) {
        self.send(&WebSocketMessage::error(message.to_string()))
            .await;
    }

    fn parse<T: DeserializeOwned>(&self, ws_message: &WebSocketMessage) -> Option<T> {
        match serde_json::from_value(ws_message.payload.clone()) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(
                    connection_id = %self.context.connection_id,
                    message_type = ?ws_message.message_type,
                    error = %e,
                    "Invalid message payload"
                );
                None
            }
        }
    }
}

#[async_trait]
impl MessageHandler for WebsocketReceiveHandler {
    async fn handle_message(&self, connection_id: &str, message: String) {
        debug!(
            connection_id = %connection_id,
            message = %message,
            "Received message"
        );

        let ws_message = match serde_json::from_str::<WebSocketMessage>(&message) {
            Ok(ws_message) => ws_message,
            Err(e) => {
                warn!(
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to parse WebSocket message"
                );
                self.send_error("Malformed message").await;
                return;
            }
        };

        match ws_message.message_type {
            MessageType::JoinRoom => {
                if let Some(payload) = self.parse(&ws_message) {
                    self.join_room(payload).await;
                }
            }
            MessageType::LeaveRoom => self.leave_room().await,
            MessageType::SubmitAnswer => {
                if let Some(payload) = self.parse(&ws_message) {
                    self.submit_answer(payload).await;
                }
            }
            MessageType::StartSinglePlayer => {
                if let Some(payload) = self.parse(&ws_message) {
                    self.start_single_player(payload).await;
                }
            }
            MessageType::StopGame => {
                // a missing payload means "stop my room"
                let payload = if ws_message.payload.is_null() {
                    Some(StopGamePayload::default())
                } else {
                    self.parse(&ws_message)
                };
                if let Some(payload) = payload {
                    self.stop_game(payload).await;
                }
            }
            MessageType::Chat => {
                if let Some(payload) = self.parse(&ws_message) {
                    self.chat(payload).await;
                }
            }
            _ => {
                debug!(
                    message_type = ?ws_message.message_type,
                    "Ignoring server-to-client message type"
                );
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub username: Option<String>,
    pub user_id: Option<String>,
}

/// WebSocket endpoint
/// GET /ws?username=..&user_id=..
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ConnectQuery>,
    State(app_state): State<AppState>,
) -> Result<Response, AppError> {
    let context = connection_context(query)?;

    info!(
        connection_id = %context.connection_id,
        username = %context.username,
        "WebSocket connection requested"
    );

    Ok(ws.on_upgrade(move |socket| handle_websocket_connection(socket, context, app_state)))
}

/// Validates the query and assigns a connection id, generating a username when absent
pub fn connection_context(query: ConnectQuery) -> Result<ConnectionContext, AppError> {
    let username = match query.username.map(|u| u.trim().to_string()) {
        Some(username) if !username.is_empty() => {
            if !USERNAME_LENGTH.contains(&username.chars().count()) {
                return Err(AppError::BadRequest(format!(
                    "username must be between {} and {} characters",
                    USERNAME_LENGTH.start(),
                    USERNAME_LENGTH.end()
                )));
            }
            username
        }
        _ => petname::Petnames::default().generate_one(2, "-"),
    };

    let user_id = query
        .user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());

    Ok(ConnectionContext {
        connection_id: Uuid::new_v4().to_string(),
        username,
        user_id,
    })
}

/// Handle the upgraded WebSocket connection
async fn handle_websocket_connection(
    socket: axum::extract::ws::WebSocket,
    context: ConnectionContext,
    app_state: AppState,
) {
    let connection_id = context.connection_id.clone();
    info!(connection_id = %connection_id, "WebSocket connection established");

    // Create the outbound channel (app -> client)
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();
    app_state
        .connection_manager
        .add_connection(connection_id.clone(), outbound_sender)
        .await;

    let message_handler = Arc::new(WebsocketReceiveHandler::new(context, &app_state));
    message_handler.handle_connect().await;

    let connection = Connection::new(
        connection_id.clone(),
        Box::new(socket),
        outbound_receiver,
        message_handler.clone(),
    );

    // Run the connection until disconnect
    match connection.run().await {
        Ok(()) => {
            info!(connection_id = %connection_id, "WebSocket connection closed cleanly");
        }
        Err(e) => {
            warn!(
                connection_id = %connection_id,
                error = %e,
                "WebSocket connection error"
            );
        }
    }

    message_handler.handle_disconnect().await;
}
