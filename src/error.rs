use crate::database::DatabaseError;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Storage errors that have no more specific mapping
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input (bad draft, bad name, bad score input)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Not found errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Caller has no identity
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Caller is known but not allowed to perform the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Business rule violations (e.g. betting on a locked match)
    #[error("Business logic error: {0}")]
    BusinessLogic(String),

    /// The atomic match + bets batch failed; nothing was applied
    #[error("Batch write failed: {0}")]
    BatchWriteFailure(String),

    /// The batch committed but some follow-up aggregate writes failed
    #[error("Partial aggregate failure: {failed} of {attempted} follow-up writes failed")]
    PartialAggregateFailure { failed: usize, attempted: usize },

    /// Store temporarily unreachable; eligible for retry
    #[error("Temporarily unavailable: {0}")]
    TransientUnavailable(String),

    /// External service errors
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// UUID parsing errors
    #[error("Invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    /// Generic error with message
    #[error("{0}")]
    Message(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Check if error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Whether the operation may succeed if simply retried
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::TransientUnavailable(_) => true,
            AppError::Store(e) => e.is_transient(),
            AppError::Database(DatabaseError::ConnectionTimeout) => true,
            _ => false,
        }
    }

    /// Wire-level error kind sent to API clients
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not-found",
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::PermissionDenied(_) => "permission-denied",
            AppError::InvalidArgument(_) | AppError::InvalidUuid(_) => "invalid-argument",
            AppError::BusinessLogic(_) => "failed-precondition",
            AppError::TransientUnavailable(_) => "unavailable",
            AppError::BatchWriteFailure(_) => "aborted",
            AppError::PartialAggregateFailure { .. } => "partial-failure",
            _ => "internal",
        }
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::Unauthenticated(_) => 401,
            AppError::PermissionDenied(_) => 403,
            AppError::InvalidArgument(_) | AppError::InvalidUuid(_) => 400,
            AppError::BusinessLogic(_) => 409,
            AppError::BatchWriteFailure(_) => 409,
            AppError::PartialAggregateFailure { .. } => 207,
            AppError::TransientUnavailable(_) => 503,
            AppError::ExternalService(_) => 502,
            _ => 500,
        }
    }
}

/// Storage-layer error types
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database query error
    #[error("Query error: {0}")]
    Query(SqlxError),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Duplicate record
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Store unreachable (pool timeout, I/O)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// An all-or-nothing batch was rolled back
    #[error("Batch aborted: {0}")]
    BatchAborted(String),

    /// JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Only connectivity problems are worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Duplicate(msg) => AppError::BusinessLogic(format!("Duplicate: {}", msg)),
            StoreError::ConstraintViolation(msg) => AppError::InvalidArgument(msg),
            StoreError::Unavailable(msg) => AppError::TransientUnavailable(msg),
            StoreError::BatchAborted(msg) => AppError::BatchWriteFailure(msg),
            other => AppError::Store(other),
        }
    }
}

impl From<SqlxError> for StoreError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => StoreError::NotFound("Record not found".to_string()),
            SqlxError::PoolTimedOut | SqlxError::PoolClosed => {
                StoreError::Unavailable(err.to_string())
            }
            SqlxError::Io(_) => StoreError::Unavailable(err.to_string()),
            SqlxError::Database(db_err) => {
                // Check for common PostgreSQL error codes
                let code = db_err.code().map(|c| c.to_string());
                if code.as_deref() == Some("23505") {
                    // Unique violation
                    StoreError::Duplicate(db_err.message().to_string())
                } else if code.as_deref() == Some("23503") {
                    // Foreign key violation
                    StoreError::ConstraintViolation(db_err.message().to_string())
                } else if code.as_deref() == Some("23514") {
                    // Check constraint violation
                    StoreError::ConstraintViolation(db_err.message().to_string())
                } else {
                    StoreError::Query(err)
                }
            }
            _ => StoreError::Query(err),
        }
    }
}
