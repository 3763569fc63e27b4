use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("transient storage failure: {0}")]
    Transient(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

// SQLITE_BUSY, SQLITE_LOCKED and their extended codes
const SQLITE_RETRYABLE_CODES: &[&str] = &["5", "6", "261", "262", "517"];

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => CoreError::NotFound("record"),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                CoreError::Transient(err.to_string())
            }
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                CoreError::Conflict(db.message().to_owned())
            }
            sqlx::Error::Database(db)
                if db
                    .code()
                    .is_some_and(|code| SQLITE_RETRYABLE_CODES.contains(&&*code)) =>
            {
                CoreError::Transient(db.message().to_owned())
            }
            _ => CoreError::Internal(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for CoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        CoreError::Internal(err.to_string())
    }
}
