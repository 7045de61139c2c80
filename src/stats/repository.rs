use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    models::{DashboardEntry, UserDashboard},
    StatsError,
};

/// Receives per-question answer outcomes from running games.
///
/// Callers never wait on this for game progress; errors are logged by the caller.
#[async_trait]
pub trait StatsSink: Send + Sync {
    async fn record_outcome(
        &self,
        user_id: &str,
        question_id: u32,
        was_correct: bool,
    ) -> Result<(), StatsError>;
}

#[async_trait]
pub trait StatsRepository: StatsSink {
    async fn dashboard_for_user(&self, user_id: &str) -> Result<UserDashboard, StatsError>;
}

#[derive(Debug, Default)]
pub struct InMemoryStatsRepository {
    // (user_id, question_id) -> entry
    entries: Arc<RwLock<HashMap<(String, u32), DashboardEntry>>>,
}

impl InMemoryStatsRepository {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl StatsSink for InMemoryStatsRepository {
    async fn record_outcome(
        &self,
        user_id: &str,
        question_id: u32,
        was_correct: bool,
    ) -> Result<(), StatsError> {
        if user_id.trim().is_empty() {
            return Err(StatsError::MissingUserId);
        }

        let mut entries = self.entries.write().await;
        entries
            .entry((user_id.to_string(), question_id))
            .and_modify(|entry| entry.record(was_correct))
            .or_insert_with(|| DashboardEntry::new(user_id.to_string(), question_id, was_correct));

        debug!(
            user_id = %user_id,
            question_id = question_id,
            was_correct = was_correct,
            "Recorded answer outcome"
        );
        Ok(())
    }
}

#[async_trait]
impl StatsRepository for InMemoryStatsRepository {
    async fn dashboard_for_user(&self, user_id: &str) -> Result<UserDashboard, StatsError> {
        if user_id.trim().is_empty() {
            return Err(StatsError::MissingUserId);
        }

        let entries = self.entries.read().await;
        let user_entries = entries
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        Ok(UserDashboard::from_entries(user_id, user_entries))
    }
}
