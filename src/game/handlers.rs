use axum::{extract::State, Json};
use tracing::{info, instrument};

use super::registry::RoomSummary;
use crate::shared::{AppError, AppState};

/// HTTP handler for listing rooms with a live session
///
/// GET /rooms
#[instrument(name = "list_rooms", skip(state))]
pub async fn list_rooms(State(state): State<AppState>) -> Result<Json<Vec<RoomSummary>>, AppError> {
    let rooms = state.registry.active_rooms().await;

    info!(room_count = rooms.len(), "Rooms listed successfully");

    Ok(Json(rooms))
}
