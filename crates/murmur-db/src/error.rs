//! Error types for the murmur-db crate.

use thiserror::Error;

/// Database infrastructure errors.
///
/// Query-level failures stay as `sqlx::Error` on the model functions so
/// callers can classify them; this type covers pool and migration setup.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to establish the connection pool.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// A database migration failed to apply.
    #[error("Migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),
}

impl DbError {
    /// Check if this error indicates a connection problem.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, DbError::ConnectionFailed(_))
    }
}
