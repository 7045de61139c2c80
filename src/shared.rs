use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::config::GameConfig;
use crate::game::RoomRegistry;
use crate::player::PresenceTracker;
use crate::quiz::QuizProvider;
use crate::stats::{StatsError, StatsRepository};
use crate::websockets::ConnectionManager;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub connection_manager: Arc<dyn ConnectionManager>,
    pub presence: Arc<PresenceTracker>,
    pub registry: Arc<RoomRegistry>,
    pub stats_repository: Arc<dyn StatsRepository>,
    pub quiz_provider: Arc<dyn QuizProvider>,
}

impl AppState {
    /// Wires the registry and presence tracker on top of the given collaborators
    pub fn new<R>(
        config: GameConfig,
        quiz_provider: Arc<dyn QuizProvider>,
        stats_repository: Arc<R>,
        connection_manager: Arc<dyn ConnectionManager>,
    ) -> Self
    where
        R: StatsRepository + 'static,
    {
        let registry = Arc::new(RoomRegistry::new(
            config,
            Arc::clone(&quiz_provider),
            stats_repository.clone(),
            Arc::clone(&connection_manager),
        ));
        let presence = Arc::new(PresenceTracker::new(
            Arc::clone(&registry),
            Arc::clone(&connection_manager),
        ));

        Self {
            connection_manager,
            presence,
            registry,
            stats_repository,
            quiz_provider,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Stats(e @ StatsError::MissingUserId) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            AppError::Stats(e @ StatsError::Unavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
