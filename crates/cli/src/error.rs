use std::path::PathBuf;

use thiserror::Error;

/// Failure of one of the controller's network or storage operations.
///
/// Stale list responses are not errors; they never reach this type.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("machine {0} is not in the current listing")]
    UnknownMachine(i64),
    #[error("failed to store dump at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FleetError {
    /// Human-readable detail shown to the operator.
    pub fn reason(&self) -> String {
        match self {
            FleetError::Transport(message) => message.clone(),
            FleetError::Server { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for FleetError {
    fn from(err: reqwest::Error) -> Self {
        FleetError::Transport(err.to_string())
    }
}
