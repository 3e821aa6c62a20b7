use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("invalid task id: {0:?}")]
    InvalidId(String),

    #[error("workspace for task {0} already exists")]
    Exists(String),

    #[error("workspace I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to launch executor: {0}")]
    Spawn(std::io::Error),

    #[error("executor exited with {}: {stderr}", code.map_or("signal".to_string(), |c| format!("status {c}")))]
    Failed { code: Option<i32>, stderr: String },

    #[error("malformed task input: {0}")]
    Input(String),

    #[error("executor I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("worker is at capacity")]
    Saturated,

    #[error("worker is shutting down")]
    ShuttingDown,

    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

impl RunnerError {
    pub fn status_code(&self) -> u16 {
        match self {
            RunnerError::Saturated => 429,
            RunnerError::ShuttingDown => 503,
            RunnerError::UnknownTask(_) => 404,
            RunnerError::Workspace(WorkspaceError::InvalidId(_)) => 400,
            RunnerError::Workspace(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(RunnerError::Saturated.status_code(), 429);
        assert_eq!(RunnerError::ShuttingDown.status_code(), 503);
        assert_eq!(RunnerError::UnknownTask("x".into()).status_code(), 404);
        assert_eq!(RunnerError::from(WorkspaceError::InvalidId("../".into())).status_code(), 400);
    }

    #[test]
    fn test_failed_message() {
        let e = ExecError::Failed { code: Some(3), stderr: "bad input".into() };
        assert_eq!(e.to_string(), "executor exited with status 3: bad input");
        let e = ExecError::Failed { code: None, stderr: String::new() };
        assert!(e.to_string().starts_with("executor exited with signal"));
    }
}
