use axum::{extract::State, Json};
use tracing::{debug, instrument};

use super::models::Player;
use crate::shared::{AppError, AppState};

/// GET /users
#[instrument(name = "connected_users", skip(state))]
pub async fn connected_users(State(state): State<AppState>) -> Result<Json<Vec<Player>>, AppError> {
    let players = state.presence.connected_players().await;
    debug!(count = players.len(), "Connected users listed");
    Ok(Json(players))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::AppStateBuilder;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_connected_users_handler() {
        let app_state = AppStateBuilder::new().build();
        app_state
            .presence
            .upsert(Player::new("conn-1", "alice").with_user_id("user-1"))
            .await;

        let app = Router::new()
            .route("/users", axum::routing::get(connected_users))
            .with_state(app_state);

        let response = app
            .oneshot(Request::builder().uri("/users").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let players: Vec<Player> = serde_json::from_slice(&body).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].username, "alice");
        assert_eq!(players[0].user_id.as_deref(), Some("user-1"));
    }
}
