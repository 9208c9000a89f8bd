use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Failed to reach trip planner API: {0}")]
    Transport(String),

    #[error("Stream not available")]
    StreamUnavailable,

    #[error("Trip planner reported an error: {0}")]
    StreamReported(String),

    #[error("No trip plan received")]
    NoPlanReceived,

    #[error("Trip plan stream was cancelled")]
    Cancelled,

    #[error("Failed to interpret stream event: {0}")]
    MalformedEvent(String),

    #[error("Failed to access credential storage: {0}")]
    Storage(String),

    #[error("Failed to (de)serialize stored data: {0}")]
    Serialization(String),

    #[error("Invalid trip plan request: {0}")]
    InvalidRequest(String),

    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for PlannerError {
    fn from(error: reqwest::Error) -> Self {
        PlannerError::Transport(error.to_string())
    }
}

impl From<serde_json::Error> for PlannerError {
    fn from(error: serde_json::Error) -> Self {
        PlannerError::Serialization(error.to_string())
    }
}
