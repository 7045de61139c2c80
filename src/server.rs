use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::game::list_rooms;
use crate::player::connected_users;
use crate::shared::AppState;
use crate::stats::user_dashboard;
use crate::websockets::websocket_handler;

/// Build the router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(websocket_handler))
        .route("/rooms", get(list_rooms))
        .route("/users", get(connected_users))
        .route("/dashboard/:user_id", get(user_dashboard))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
