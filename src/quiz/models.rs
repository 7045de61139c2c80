use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::QuizError;

/// Most incorrect choices a round will carry next to its correct one
pub const MAX_INCORRECT_CHOICES: usize = 3;

/// Content file model for a topic and its question bank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicModel {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub questions: Vec<QuestionModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionModel {
    pub id: u32,
    pub text: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub answers: Vec<AnswerModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerModel {
    pub id: u32,
    pub text: String,
    #[serde(default)]
    pub correct: bool,
    #[serde(default)]
    pub archived: bool,
}

/// One selectable option of a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: u32,
    pub text: String,
}

impl Choice {
    pub fn new(id: u32, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// Immutable snapshot of a question as presented to a room.
///
/// Holds exactly one correct choice and between one and three incorrect ones.
/// The choice order is fixed when the round is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    question_id: u32,
    text: String,
    choices: Vec<Choice>,
    correct_choice_id: u32,
}

impl Round {
    /// Builds a round from choices in their final display order
    pub fn new(
        question_id: u32,
        text: impl Into<String>,
        choices: Vec<Choice>,
        correct_choice_id: u32,
    ) -> Result<Self, QuizError> {
        if !(2..=MAX_INCORRECT_CHOICES + 1).contains(&choices.len()) {
            return Err(QuizError::InvalidRound(format!(
                "question {} has {} choices, expected 2 to {}",
                question_id,
                choices.len(),
                MAX_INCORRECT_CHOICES + 1
            )));
        }

        let correct_count = choices
            .iter()
            .filter(|c| c.id == correct_choice_id)
            .count();
        if correct_count != 1 {
            return Err(QuizError::InvalidRound(format!(
                "question {} must contain its correct choice exactly once",
                question_id
            )));
        }

        Ok(Self {
            question_id,
            text: text.into(),
            choices,
            correct_choice_id,
        })
    }

    /// Samples up to three incorrect choices and shuffles them together with the
    /// correct one. Returns `None` when no incorrect choice is available.
    pub fn assemble<R: Rng + ?Sized>(
        question_id: u32,
        text: impl Into<String>,
        correct: Choice,
        incorrect: &[Choice],
        rng: &mut R,
    ) -> Option<Self> {
        if incorrect.is_empty() {
            return None;
        }

        let correct_choice_id = correct.id;
        let mut choices: Vec<Choice> = incorrect
            .choose_multiple(rng, MAX_INCORRECT_CHOICES)
            .cloned()
            .collect();
        choices.push(correct);
        choices.shuffle(rng);

        Some(Self {
            question_id,
            text: text.into(),
            choices,
            correct_choice_id,
        })
    }

    pub fn question_id(&self) -> u32 {
        self.question_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    pub fn correct_choice_id(&self) -> u32 {
        self.correct_choice_id
    }

    pub fn is_correct(&self, choice_id: u32) -> bool {
        self.correct_choice_id == choice_id
    }

    pub fn has_choice(&self, choice_id: u32) -> bool {
        self.choices.iter().any(|c| c.id == choice_id)
    }

    /// Question id 0 marks content that was never stored, so outcomes are not recorded
    pub fn has_valid_id(&self) -> bool {
        self.question_id != 0
    }
}
