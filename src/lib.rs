// Library crate for the quiz room server
// This file exposes the public API for integration tests

pub mod config;
pub mod game;
pub mod player;
pub mod quiz;
pub mod server;
pub mod shared;
pub mod stats;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use config::{GameConfig, ServerConfig};
pub use game::{GameSession, GameView, Phase, RoomRegistry};
pub use player::{Player, PresenceTracker};
pub use quiz::{InMemoryQuizProvider, QuizProvider, Round};
pub use shared::{AppError, AppState};
pub use stats::{InMemoryStatsRepository, StatsRepository, StatsSink};
pub use websockets::{
    ConnectionManager, MessageHandler, MessageType, WebSocketMessage, WebsocketReceiveHandler,
};
