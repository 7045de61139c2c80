// Public API
pub use models::{AnswerModel, Choice, QuestionModel, Round, TopicModel};
pub use provider::{InMemoryQuizProvider, QuizProvider};

// Internal modules
pub mod models;
mod provider;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("Invalid round: {0}")]
    InvalidRound(String),

    #[error("Failed to read quiz content: {0}")]
    Io(String),

    #[error("Failed to parse quiz content: {0}")]
    Parse(#[from] serde_json::Error),
}
