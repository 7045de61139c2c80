use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::{
    models::{Choice, Round, TopicModel},
    QuizError,
};

/// Source of quiz rounds for a room.
///
/// An empty list means the topic cannot be played.
#[async_trait]
pub trait QuizProvider: Send + Sync {
    async fn rounds_for_topic(&self, topic_id: &str) -> Vec<Round>;
}

#[derive(Debug, serde::Deserialize)]
struct QuizContentFile {
    topics: Vec<TopicModel>,
}

/// In-memory question bank that assembles fresh rounds on every request
pub struct InMemoryQuizProvider {
    topics: Arc<RwLock<HashMap<String, TopicModel>>>,
}

impl Default for InMemoryQuizProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQuizProvider {
    pub fn new() -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn from_topics(topics: Vec<TopicModel>) -> Self {
        let topics = topics.into_iter().map(|t| (t.id.clone(), t)).collect();
        Self {
            topics: Arc::new(RwLock::new(topics)),
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, QuizError> {
        let file: QuizContentFile = serde_json::from_str(content)?;
        info!(topic_count = file.topics.len(), "Loaded quiz content");
        Ok(Self::from_topics(file.topics))
    }

    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, QuizError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| QuizError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    /// Adds or replaces a topic
    pub async fn add_topic(&self, topic: TopicModel) {
        let mut topics = self.topics.write().await;
        topics.insert(topic.id.clone(), topic);
    }

    pub async fn topic_ids(&self) -> Vec<String> {
        let topics = self.topics.read().await;
        topics.keys().cloned().collect()
    }
}

#[async_trait]
impl QuizProvider for InMemoryQuizProvider {
    #[instrument(skip(self))]
    async fn rounds_for_topic(&self, topic_id: &str) -> Vec<Round> {
        let topics = self.topics.read().await;

        let Some(topic) = topics.get(topic_id).filter(|t| !t.archived) else {
            warn!(topic_id = %topic_id, "Topic not found");
            return Vec::new();
        };

        let mut rng = rand::rng();
        let rounds: Vec<Round> = topic
            .questions
            .iter()
            .filter(|q| !q.archived)
            .filter_map(|question| {
                let live_answers = question.answers.iter().filter(|a| !a.archived);

                let correct = live_answers
                    .clone()
                    .find(|a| a.correct)
                    .map(|a| Choice::new(a.id, a.text.clone()))?;
                let incorrect: Vec<Choice> = live_answers
                    .filter(|a| !a.correct)
                    .map(|a| Choice::new(a.id, a.text.clone()))
                    .collect();

                Round::assemble(question.id, question.text.clone(), correct, &incorrect, &mut rng)
            })
            .collect();

        debug!(
            topic_id = %topic_id,
            questions = topic.questions.len(),
            rounds = rounds.len(),
            "Assembled rounds for topic"
        );

        rounds
    }
}
