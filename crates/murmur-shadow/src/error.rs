//! Error types for the synchronization handler.

use murmur_events::DeliveryError;
use thiserror::Error;
use uuid::Uuid;

/// Failures while applying an event to the shadow store.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An update event omitted a field the full-row replace requires.
    /// Absent does not mean "leave unchanged"; the event is invalid input.
    #[error("user {id}: update event is missing required field `{field}`")]
    MissingField { id: Uuid, field: &'static str },

    /// A database operation failed (acquire, apply, or commit).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl SyncError {
    /// Returns true if retrying the same event could succeed.
    ///
    /// Pool and transport problems are transient; validation failures,
    /// constraint violations and missing rows are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::MissingField { .. } => false,
            SyncError::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
                    | sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
            ),
        }
    }
}

impl From<SyncError> for DeliveryError {
    fn from(err: SyncError) -> Self {
        if err.is_transient() {
            DeliveryError::transient(err.to_string())
        } else {
            DeliveryError::permanent(err.to_string())
        }
    }
}
