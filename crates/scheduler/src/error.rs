use graphsplit_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure talking to a worker. Never retried by the client itself.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("worker request timed out")]
    Timeout,

    #[error("worker unreachable: {0}")]
    Transport(String),

    #[error("worker answered HTTP {0}")]
    Status(u16),

    #[error("malformed worker response: {0}")]
    Decode(String),

    #[error("worker answered for task {got}, expected {expected}")]
    MismatchedId { expected: String, got: String },
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ClientError::Status(status.as_u16())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("worker error: {0}")]
    Worker(#[from] ClientError),

    #[error("internal error: {0}")]
    Internal(String),
}
