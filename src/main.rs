use quizroom::{
    server::build_router, AppState, InMemoryQuizProvider, InMemoryStatsRepository, ServerConfig,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizroom::websockets::InMemoryConnectionManager;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizroom=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting quiz room server");

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let quiz_provider = match &config.quiz_content_path {
        Some(path) => match InMemoryQuizProvider::from_json_file(path).await {
            Ok(provider) => {
                info!(path = %path.display(), "Quiz content loaded");
                provider
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load quiz content");
                std::process::exit(1);
            }
        },
        None => {
            warn!("QUIZ_CONTENT_PATH not set, starting without quiz content");
            InMemoryQuizProvider::new()
        }
    };

    let app_state = AppState::new(
        config.game.clone(),
        Arc::new(quiz_provider),
        Arc::new(InMemoryStatsRepository::new()),
        Arc::new(InMemoryConnectionManager::new()),
    );

    let app = build_router(app_state);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(bind_addr = %config.bind_addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };
    info!(bind_addr = %config.bind_addr, "Server running");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server error");
    }
}
