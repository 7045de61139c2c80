use thiserror::Error;

/// Failures of the answer statistics store
#[derive(Debug, Error)]
pub enum StatsError {
    /// Outcomes and dashboards are keyed by user id, so a blank one is refused
    #[error("user id cannot be empty")]
    MissingUserId,

    #[error("stats store unavailable: {0}")]
    Unavailable(String),
}
