use graphsplit_core::TransitionError;
use thiserror::Error;
use uuid::Uuid;

/// Errors from job and task persistence.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("job not found: {0}")]
    JobNotFound(Uuid),

    #[error("task not found: {0}")]
    TaskNotFound(Uuid),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::JobNotFound(_) | Self::TaskNotFound(_))
    }

    /// Map to an HTTP status code for API responses.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::JobNotFound(_) | Self::TaskNotFound(_) => 404,
            Self::InvalidTransition(_) => 409,
            Self::Unavailable(_) => 503,
            Self::Corrupt(_) | Self::Database(_) | Self::Migrate(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphsplit_core::Status;

    #[test]
    fn test_status_codes() {
        assert_eq!(StoreError::JobNotFound(Uuid::nil()).status_code(), 404);
        assert_eq!(StoreError::TaskNotFound(Uuid::nil()).status_code(), 404);
        let t = TransitionError { from: Status::Completed, to: Status::Completed };
        assert_eq!(StoreError::from(t).status_code(), 409);
        assert_eq!(StoreError::Database(sqlx::Error::RowNotFound).status_code(), 500);
    }

    #[test]
    fn test_not_found_is_distinct_from_infrastructure() {
        assert!(StoreError::TaskNotFound(Uuid::nil()).is_not_found());
        assert!(!StoreError::Unavailable("down".into()).is_not_found());
    }
}
