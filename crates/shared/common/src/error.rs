//! Unified error handling for the application layer.
//!
//! Domain failures are typed and returned to callers verbatim; storage
//! failures keep their original cause attached but never expose it through
//! [`AppError::user_message`].

use domain::DomainError;
use thiserror::Error;

/// PostgreSQL SQLSTATE for `unique_violation`
#[cfg(feature = "database")]
const UNIQUE_VIOLATION: &str = "23505";

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed username/email/full name, rejected before storage access
    #[error("{0}")]
    InvalidInput(String),

    /// Pre-check found an existing username or email
    #[error("User already exists: {0}")]
    DuplicateUser(String),

    /// Storage-level unique constraint fired (a race the pre-check missed)
    #[error("Unique constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Resource not found")]
    NotFound,

    /// Connection, pool or query failure
    #[error("Storage unavailable")]
    StorageUnavailable(#[from] StorageError),
}

/// Underlying storage failure, kept for logging and `source()` chains.
#[derive(Error, Debug)]
pub enum StorageError {
    #[cfg(feature = "database")]
    #[error("ORM driver error: {0}")]
    Orm(#[source] sea_orm::DbErr),

    #[cfg(feature = "database")]
    #[error("raw driver error: {0}")]
    Raw(#[source] sqlx::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::DuplicateUser(_) => "USER_CREATE_DUPLICATED",
            AppError::ConstraintViolation(_) => "CONSTRAINT_VIOLATION",
            AppError::NotFound => "NOT_FOUND",
            AppError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            // Show full message for client errors
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::DuplicateUser(_) | AppError::NotFound => self.to_string(),

            // Hide details for storage errors
            AppError::ConstraintViolation(detail) => {
                tracing::warn!("Unique constraint violation: {}", detail);
                "User already exists".to_string()
            }
            AppError::StorageUnavailable(e) => {
                tracing::error!("Storage error: {:?}", e);
                "A database error occurred".to_string()
            }
        }
    }

    /// Whether the failure came from the storage layer rather than business rules
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            AppError::StorageUnavailable(_) | AppError::ConstraintViolation(_)
        )
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::InvalidInput(msg),
        }
    }
}

// =============================================================================
// Driver Error Conversion
// =============================================================================

#[cfg(feature = "database")]
impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(detail)) => {
                AppError::ConstraintViolation(detail)
            }
            _ => AppError::StorageUnavailable(StorageError::Orm(err)),
        }
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return AppError::ConstraintViolation(db_err.message().to_string());
            }
        }
        AppError::StorageUnavailable(StorageError::Raw(err))
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    pub fn duplicate_user(identifier: impl Into<String>) -> Self {
        AppError::DuplicateUser(identifier.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        AppError::StorageUnavailable(StorageError::Other(msg.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_domain_validation_becomes_invalid_input() {
        let err: AppError = DomainError::validation("Invalid email format").into();

        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(err.code(), "INVALID_INPUT");
        assert_eq!(err.user_message(), "Invalid email format");
    }

    #[test]
    fn test_duplicate_user_message() {
        let err = AppError::duplicate_user("alice");

        assert_eq!(err.user_message(), "User already exists: alice");
        assert!(!err.is_storage());
    }

    #[test]
    fn test_storage_message_is_hidden() {
        let err = AppError::storage("connection refused by 10.0.0.3");

        assert_eq!(err.code(), "STORAGE_UNAVAILABLE");
        assert_eq!(err.user_message(), "A database error occurred");
        assert!(err.is_storage());
    }

    #[test]
    fn test_storage_cause_is_attached() {
        let err = AppError::storage("pool timed out");

        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("pool timed out"));
    }

    #[test]
    fn test_ok_or_not_found() {
        let missing: Option<i32> = None;
        assert!(matches!(missing.ok_or_not_found(), Err(AppError::NotFound)));
        assert_eq!(Some(7).ok_or_not_found().unwrap(), 7);
    }

    #[cfg(feature = "database")]
    #[test]
    fn test_generic_db_error_is_storage_unavailable() {
        let err: AppError = sea_orm::DbErr::Custom("boom".to_string()).into();

        assert!(matches!(
            err,
            AppError::StorageUnavailable(StorageError::Orm(_))
        ));
    }

    #[cfg(feature = "database")]
    #[test]
    fn test_pool_timeout_is_storage_unavailable() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();

        assert!(matches!(
            err,
            AppError::StorageUnavailable(StorageError::Raw(_))
        ));
    }

    #[cfg(feature = "database")]
    mod sqlstate {
        use std::borrow::Cow;
        use std::fmt;

        use sqlx::error::{DatabaseError, ErrorKind};

        /// Server error carrying only a SQLSTATE and a message.
        #[derive(Debug)]
        pub struct ServerError {
            pub code: &'static str,
            pub message: &'static str,
        }

        impl fmt::Display for ServerError {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} ({})", self.message, self.code)
            }
        }

        impl std::error::Error for ServerError {}

        impl DatabaseError for ServerError {
            fn message(&self) -> &str {
                self.message
            }

            fn code(&self) -> Option<Cow<'_, str>> {
                Some(Cow::Borrowed(self.code))
            }

            fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
                self
            }

            fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
                self
            }

            fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
                self
            }

            fn kind(&self) -> ErrorKind {
                match self.code {
                    "23505" => ErrorKind::UniqueViolation,
                    _ => ErrorKind::Other,
                }
            }
        }

        pub fn sqlx_error(code: &'static str, message: &'static str) -> sqlx::Error {
            sqlx::Error::Database(Box::new(ServerError { code, message }))
        }
    }

    #[cfg(feature = "database")]
    #[test]
    fn test_sqlx_unique_violation_is_constraint_violation() {
        let err: AppError = sqlstate::sqlx_error(
            "23505",
            "duplicate key value violates unique constraint \"users_username_key\"",
        )
        .into();

        match err {
            AppError::ConstraintViolation(detail) => assert!(detail.contains("users_username_key")),
            other => panic!("expected ConstraintViolation, got {:?}", other),
        }
    }

    #[cfg(feature = "database")]
    #[test]
    fn test_sqlx_other_sqlstate_is_storage_unavailable() {
        let err: AppError =
            sqlstate::sqlx_error("25006", "cannot execute INSERT in a read-only transaction")
                .into();

        assert!(matches!(
            err,
            AppError::StorageUnavailable(StorageError::Raw(_))
        ));
        assert_eq!(err.user_message(), "A database error occurred");
    }
}
