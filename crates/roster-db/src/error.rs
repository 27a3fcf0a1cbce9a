//! # Database Error Types
//!
//! Driver-level errors for the Postgres and MongoDB backends.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / mongodb::error::Error                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Categorizes constraint codes                  │
//! │       │                                                                 │
//! │       ├── UniqueViolation      → repository maps to AlreadyExists      │
//! │       ├── ForeignKeyViolation  → repository maps to Reference*         │
//! │       ▼                                                                 │
//! │  RepoError::Internal (everything else)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (in roster-api) ← HTTP status / gRPC code                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use mongodb::error::{ErrorKind, WriteFailure};
use roster_core::RepoError;
use thiserror::Error;

/// Postgres SQLSTATE for unique_violation.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// Postgres SQLSTATE for foreign_key_violation.
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// MongoDB server code for a duplicate key on a unique index.
const MONGO_DUPLICATE_KEY: i32 = 11000;

/// Database operation errors.
///
/// These errors wrap driver errors and categorize the constraint failures
/// the repositories need to translate into contract errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate primary key (Postgres)
    /// - Inserting a duplicate `id` into a collection with the unique index (MongoDB)
    #[error("Duplicate key: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting an employee whose position was deleted concurrently
    /// - Deleting a position an employee was just attached to
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Server unreachable or refused the credentials
    /// - MongoDB server selection timed out
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database(23505) → DbError::UniqueViolation
/// sqlx::Error::Database(23503) → DbError::ForeignKeyViolation
/// sqlx::Error::Database(other) → DbError::QueryFailed
/// sqlx::Error::PoolTimedOut    → DbError::PoolExhausted
/// Other                        → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();
                match db_err.code().as_deref() {
                    Some(PG_UNIQUE_VIOLATION) => DbError::UniqueViolation(msg),
                    Some(PG_FOREIGN_KEY_VIOLATION) => DbError::ForeignKeyViolation(msg),
                    _ => DbError::QueryFailed(msg),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::Io(io) => DbError::ConnectionFailed(io.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Convert MongoDB driver errors to DbError.
impl From<mongodb::error::Error> for DbError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_err))
                if write_err.code == MONGO_DUPLICATE_KEY =>
            {
                DbError::UniqueViolation(write_err.message.clone())
            }
            ErrorKind::ServerSelection { message, .. } => {
                DbError::ConnectionFailed(message.clone())
            }
            ErrorKind::Authentication { message, .. } => {
                DbError::ConnectionFailed(message.clone())
            }
            _ => DbError::QueryFailed(err.to_string()),
        }
    }
}

/// Uncategorized driver failures surface as `RepoError::Internal`.
///
/// Constraint violations are translated by the repositories themselves,
/// since only they know the entity and ID involved.
impl From<DbError> for RepoError {
    fn from(err: DbError) -> Self {
        RepoError::Internal(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
