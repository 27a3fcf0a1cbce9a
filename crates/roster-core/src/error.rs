//! # Error Types
//!
//! Error taxonomy shared by every repository backend.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  roster-core errors (this file)                                        │
//! │  ├── RepoError        - Repository contract failures                   │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  roster-db errors                                                      │
//! │  ├── DbError          - Driver failures (sqlx, mongodb) → RepoError    │
//! │  └── CacheError       - Redis failures (logged, never propagated)      │
//! │                                                                         │
//! │  roster-api errors                                                     │
//! │  └── ApiError         - HTTP status / gRPC Status + Unauthorized       │
//! │                                                                         │
//! │  Flow: ValidationError → RepoError → ApiError → client                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## NotFound vs NothingChanged
//! `NotFound` means no row/document has the ID. `NothingChanged` means the
//! row exists but the write carried exactly the values already stored.

use thiserror::Error;

// =============================================================================
// Repository Error
// =============================================================================

/// Failures a repository contract can report.
///
/// Every backend (memory, Postgres, MongoDB) maps its native failures onto
/// these variants so callers never see which engine is underneath.
#[derive(Debug, Error)]
pub enum RepoError {
    /// No entity with this ID.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Create with an ID that is already stored.
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    /// The entity exists but the update carried no change.
    #[error("nothing changed for {entity} {id}")]
    NothingChanged { entity: &'static str, id: String },

    /// An employee write referenced a position that does not exist.
    ///
    /// ## When This Occurs
    /// ```text
    /// Employee.create { position_id: "p-42" }
    ///      │
    ///      ▼
    /// PositionRepository::get("p-42") → NotFound
    ///      │
    ///      ▼
    /// ReferenceInvalid { action: "create", position_id: "p-42" }
    /// ```
    #[error("error to {action} employee: position {position_id} does not exist")]
    ReferenceInvalid {
        action: &'static str,
        position_id: String,
    },

    /// A position delete was blocked because an employee still references it.
    #[error("position {position_id} in use by employee")]
    ReferenceInUse { position_id: String },

    /// Input failed validation before reaching storage.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Backend call exceeded its deadline.
    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: String, millis: u64 },

    /// Uncategorized backend failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RepoError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        RepoError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates an AlreadyExists error.
    pub fn already_exists(entity: &'static str, id: impl Into<String>) -> Self {
        RepoError::AlreadyExists {
            entity,
            id: id.into(),
        }
    }

    /// Creates a NothingChanged error.
    pub fn nothing_changed(entity: &'static str, id: impl Into<String>) -> Self {
        RepoError::NothingChanged {
            entity,
            id: id.into(),
        }
    }

    /// Prefixes the message of transport-level failures with `context`.
    ///
    /// Categorized variants (NotFound, Validation, ...) keep their shape so
    /// the transport can still map them to a precise status.
    pub fn context(self, context: &str) -> Self {
        match self {
            RepoError::Internal(msg) => RepoError::Internal(format!("{}: {}", context, msg)),
            RepoError::Timeout { operation, millis } => RepoError::Timeout {
                operation: format!("{}: {}", context, operation),
                millis,
            },
            other => other,
        }
    }

    /// True for NotFound.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::NotFound { .. })
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Checked before any storage access.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., unparsable page number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for repository results.
pub type RepoResult<T> = Result<T, RepoError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RepoError::not_found("position", "p-1");
        assert_eq!(err.to_string(), "position not found: p-1");

        let err = RepoError::ReferenceInvalid {
            action: "create",
            position_id: "p-9".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "error to create employee: position p-9 does not exist"
        );
    }

    #[test]
    fn test_validation_converts_to_repo_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let repo_err: RepoError = validation_err.into();
        assert!(matches!(repo_err, RepoError::Validation(_)));
        assert_eq!(repo_err.to_string(), "validation error: name is required");
    }

    #[test]
    fn test_context_only_touches_uncategorized_errors() {
        let err = RepoError::Internal("connection reset".into()).context("error to update employee");
        assert_eq!(
            err.to_string(),
            "internal error: error to update employee: connection reset"
        );

        let err = RepoError::not_found("employee", "e-1").context("error to update employee");
        assert!(err.is_not_found());
    }
}
