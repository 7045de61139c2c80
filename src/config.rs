use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Timing and length settings shared by every game session
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Upper bound on rounds per game, capped by the available content
    pub rounds_per_game: usize,
    /// Countdown length of a round, in ticks
    pub seconds_to_answer: u32,
    /// Ticks the correct choice stays revealed before the next round loads
    pub reveal_ticks: u32,
    /// How long the result summary is shown before the game restarts
    pub summary_duration: Duration,
    /// Period of the round clock
    pub tick_interval: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rounds_per_game: 10,
            seconds_to_answer: 10,
            reveal_ticks: 2,
            summary_duration: Duration::from_secs(10),
            tick_interval: Duration::from_secs(1),
        }
    }
}

/// Process level settings for the server binary
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub quiz_content_path: Option<PathBuf>,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            quiz_content_path: None,
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Builds the configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("QUIZROOM_BIND_ADDR") {
            config.bind_addr = addr;
        }
        config.quiz_content_path = lookup("QUIZ_CONTENT_PATH").map(PathBuf::from);

        if let Some(rounds) = parse_var::<usize>(&lookup, "QUIZ_ROUNDS_PER_GAME")? {
            // a game needs at least one round
            if rounds == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "QUIZ_ROUNDS_PER_GAME",
                    value: rounds.to_string(),
                });
            }
            config.game.rounds_per_game = rounds;
        }
        if let Some(seconds) = parse_var::<u32>(&lookup, "QUIZ_SECONDS_TO_ANSWER")? {
            config.game.seconds_to_answer = seconds;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "QUIZ_SUMMARY_SECS")? {
            config.game.summary_duration = Duration::from_secs(secs);
        }

        debug!(config = ?config, "Loaded server configuration");
        Ok(config)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(None),
    }
}
