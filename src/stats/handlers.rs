use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument};

use super::models::UserDashboard;
use crate::shared::{AppError, AppState};

/// GET /dashboard/{user_id}
#[instrument(name = "user_dashboard", skip(state))]
pub async fn user_dashboard(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserDashboard>, AppError> {
    let dashboard = state.stats_repository.dashboard_for_user(&user_id).await?;

    info!(
        user_id = %user_id,
        questions = dashboard.entries.len(),
        "Dashboard retrieved"
    );

    Ok(Json(dashboard))
}
