use thiserror::Error;

/// Errors that can occur when querying the activity log.
#[derive(Debug, Error)]
pub enum ActivityError {
    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored event could not be decoded.
    #[error("unknown action kind: {0}")]
    UnknownAction(String),
}

/// Result type for activity log queries.
pub type Result<T> = std::result::Result<T, ActivityError>;
