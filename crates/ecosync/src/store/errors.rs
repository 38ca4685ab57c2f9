use sea_orm::DbErr;
use thiserror::Error;

use crate::platform::ErrorClass;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Row not found.
    #[error("Not found: {context}")]
    NotFound { context: String },

    /// Invalid input data.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl StoreError {
    /// Create a NotFound error for a repository key.
    pub fn repository_not_found(organization: &str, name: &str) -> Self {
        Self::NotFound {
            context: format!("repository {organization}/{name}"),
        }
    }

    /// Create an InvalidInput error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Storage failures are always [`ErrorClass::Persistence`].
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Persistence
    }

    /// Whether the failure is likely transient (locked, busy, dropped connection).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(db_err) => is_retryable_db_error(db_err),
            _ => false,
        }
    }
}

pub(crate) fn is_retryable_db_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(_) | DbErr::Query(_) => {
            let err_str = err.to_string().to_lowercase();
            // SQLite: database is locked, busy
            // PostgreSQL: connection refused, too many connections
            err_str.contains("locked")
                || err_str.contains("busy")
                || err_str.contains("timeout")
                || err_str.contains("connection")
                || err_str.contains("temporarily unavailable")
        }
        _ => false,
    }
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
