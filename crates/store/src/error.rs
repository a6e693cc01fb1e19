use thiserror::Error;

/// Errors that can occur when interacting with the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Username or email uniqueness was violated.
    #[error("duplicate identity: {0} already exists")]
    DuplicateIdentity(String),

    /// SKU uniqueness was violated.
    #[error("duplicate SKU: {0} already exists")]
    DuplicateSku(String),

    /// A relational constraint was violated (foreign key, check).
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
