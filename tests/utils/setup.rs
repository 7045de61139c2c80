use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use quizroom::{
    quiz::{AnswerModel, QuestionModel, TopicModel},
    websockets::{ConnectionContext, WebsocketReceiveHandler},
    AppState, GameConfig, InMemoryQuizProvider, InMemoryStatsRepository,
};

use super::mocks::MockConnectionManager;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub app_state: AppState,
    pub mock_conn_manager: Arc<MockConnectionManager>,
    pub stats_repository: Arc<InMemoryStatsRepository>,
    pub handlers: HashMap<String, Arc<WebsocketReceiveHandler>>,
    pub players: Vec<String>,
}

pub struct TestSetupBuilder {
    players: Vec<String>,
    topics: Vec<String>,
    questions_per_topic: u32,
    config: GameConfig,
}

/// Choice id of the correct answer for question `question_id`
pub fn correct_choice(question_id: u32) -> u32 {
    question_id * 10 + 1
}

/// Choice id of the wrong answer for question `question_id`
pub fn wrong_choice(question_id: u32) -> u32 {
    question_id * 10
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            players: vec![],
            topics: vec!["42".to_string(), "7".to_string()],
            questions_per_topic: 3,
            config: GameConfig {
                rounds_per_game: 10,
                seconds_to_answer: 10,
                reveal_ticks: 2,
                summary_duration: Duration::from_secs(10),
                tick_interval: Duration::from_secs(1),
            },
        }
    }

    pub fn with_players(mut self, players: Vec<&str>) -> Self {
        self.players = players.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_two_players(self) -> Self {
        self.with_players(vec!["alice", "bob"])
    }

    pub fn with_questions(mut self, questions_per_topic: u32) -> Self {
        self.questions_per_topic = questions_per_topic;
        self
    }

    pub fn with_rounds_per_game(mut self, rounds: usize) -> Self {
        self.config.rounds_per_game = rounds;
        self
    }

    fn quiz_content(&self) -> Vec<TopicModel> {
        self.topics
            .iter()
            .map(|topic_id| TopicModel {
                id: topic_id.clone(),
                text: format!("Topic {}", topic_id),
                archived: false,
                questions: (1..=self.questions_per_topic)
                    .map(|id| QuestionModel {
                        id,
                        text: format!("Question {}", id),
                        archived: false,
                        answers: vec![
                            AnswerModel {
                                id: correct_choice(id),
                                text: "right".to_string(),
                                correct: true,
                                archived: false,
                            },
                            AnswerModel {
                                id: wrong_choice(id),
                                text: "wrong".to_string(),
                                correct: false,
                                archived: false,
                            },
                        ],
                    })
                    .collect(),
            })
            .collect()
    }

    pub async fn build(self) -> TestSetup {
        let mock_conn_manager = Arc::new(MockConnectionManager::new());
        let stats_repository = Arc::new(InMemoryStatsRepository::new());
        let app_state = AppState::new(
            self.config.clone(),
            Arc::new(InMemoryQuizProvider::from_topics(self.quiz_content())),
            stats_repository.clone(),
            mock_conn_manager.clone(),
        );

        // Connect players; the connection id doubles as the username
        let mut handlers = HashMap::new();
        for player in &self.players {
            mock_conn_manager.add_connected_player(player).await;
            let context = ConnectionContext {
                connection_id: player.clone(),
                username: player.clone(),
                user_id: Some(format!("user-{}", player)),
            };
            let handler = Arc::new(WebsocketReceiveHandler::new(context, &app_state));
            handler.handle_connect().await;
            handlers.insert(player.clone(), handler);
        }
        mock_conn_manager.clear_messages().await;

        TestSetup {
            app_state,
            mock_conn_manager,
            stats_repository,
            handlers,
            players: self.players,
        }
    }
}
