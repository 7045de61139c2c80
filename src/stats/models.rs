use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Answer tally for one user on one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardEntry {
    pub user_id: String,
    pub question_id: u32,
    pub correct_answers: u32,
    pub wrong_answers: u32,
    pub created_at: DateTime<Utc>,
}

impl DashboardEntry {
    pub fn new(user_id: String, question_id: u32, was_correct: bool) -> Self {
        Self {
            user_id,
            question_id,
            correct_answers: u32::from(was_correct),
            wrong_answers: u32::from(!was_correct),
            created_at: Utc::now(),
        }
    }

    pub fn record(&mut self, was_correct: bool) {
        if was_correct {
            self.correct_answers += 1;
        } else {
            self.wrong_answers += 1;
        }
    }
}

/// Per-user totals across every question answered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDashboard {
    pub user_id: String,
    pub total_correct: u32,
    pub total_wrong: u32,
    pub entries: Vec<DashboardEntry>,
}

impl UserDashboard {
    pub fn from_entries(user_id: &str, mut entries: Vec<DashboardEntry>) -> Self {
        entries.sort_by_key(|e| e.question_id);
        Self {
            user_id: user_id.to_string(),
            total_correct: entries.iter().map(|e| e.correct_answers).sum(),
            total_wrong: entries.iter().map(|e| e.wrong_answers).sum(),
            entries,
        }
    }
}
