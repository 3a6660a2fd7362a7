//! Application-wide error types.

use thiserror::Error;

use crate::agent::AgentError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
