use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::player::Player;
use crate::quiz::Round;

/// Where a session is in its round cycle
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[default]
    NotStarted,
    /// Countdown running, answers accepted
    Counting,
    /// Correct choice visible, answers locked
    Revealing,
    Transitioning,
    /// Final scores visible until the automatic restart
    Summarizing,
    Ended,
}

impl Phase {
    pub fn accepts_answers(self) -> bool {
        matches!(self, Phase::Counting)
    }

    /// Phases driven by the round clock
    pub fn is_ticking(self) -> bool {
        matches!(self, Phase::Counting | Phase::Revealing | Phase::Transitioning)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceView {
    pub id: u32,
    pub text: String,
    /// Only present once the round is revealed
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub correct: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundView {
    pub question_id: u32,
    pub text: String,
    pub choices: Vec<ChoiceView>,
}

impl RoundView {
    pub fn from_round(round: &Round, reveal: bool) -> Self {
        let choices = round
            .choices()
            .iter()
            .map(|choice| ChoiceView {
                id: choice.id,
                text: choice.text.clone(),
                correct: reveal.then(|| round.is_correct(choice.id)),
            })
            .collect();

        Self {
            question_id: round.question_id(),
            text: round.text().to_string(),
            choices,
        }
    }
}

/// Client facing snapshot of a session, sent as the `UPDATE_GAME` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameView {
    pub room_id: String,
    pub topic_id: Option<String>,
    pub game_started: bool,
    pub phase: Phase,
    pub rounds: usize,
    pub rounds_left: usize,
    pub round_number: usize,
    pub seconds_to_answer: u32,
    pub time_left_to_answer: u32,
    /// Percent of the countdown already elapsed
    pub progress: u8,
    pub show_correct_answer: bool,
    pub show_result: bool,
    pub current_round: Option<RoundView>,
    pub players: Vec<Player>,
}

impl GameView {
    /// View sent to members who joined while a game was already running
    pub fn waiting(room_id: &str, seconds_to_answer: u32, players: Vec<Player>) -> Self {
        Self {
            room_id: room_id.to_string(),
            topic_id: None,
            game_started: false,
            phase: Phase::NotStarted,
            rounds: 0,
            rounds_left: 0,
            round_number: 0,
            seconds_to_answer,
            time_left_to_answer: seconds_to_answer,
            progress: 0,
            show_correct_answer: false,
            show_result: false,
            current_round: None,
            players,
        }
    }
}

pub(crate) fn progress_percent(seconds_to_answer: u32, time_left: u32) -> u8 {
    if seconds_to_answer == 0 {
        return 100;
    }
    let elapsed = seconds_to_answer.saturating_sub(time_left);
    // elapsed <= seconds_to_answer, so the result fits in a u8
    ((elapsed * 100) / seconds_to_answer) as u8
}
