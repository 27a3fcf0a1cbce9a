//! # Validation Module
//!
//! Field rules checked by every repository before touching storage.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Transport (REST/gRPC)                                        │
//! │  └── Type validation (deserialization, page/size parsing)              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repository (every backend)                                   │
//! │  ├── THIS MODULE: field rules                                          │
//! │  └── Referential integrity (position must exist)                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Storage                                                      │
//! │  ├── PRIMARY KEY / unique index on id                                  │
//! │  └── Foreign key (Postgres only)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use roster_core::validation::validate_position;
//! use roster_core::Position;
//!
//! assert!(validate_position(&Position::new("Engineer", 1000)).is_ok());
//! assert!(validate_position(&Position::new("", 1000)).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{Employee, Position};
use crate::{MAX_PERSON_NAME_LEN, MAX_POSITION_NAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates that an ID is present.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a required text field and its maximum length.
fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a salary.
///
/// ## Rules
/// - Must not be negative (zero is allowed for unpaid positions)
pub fn validate_salary(salary: i64) -> ValidationResult<()> {
    if salary < 0 {
        return Err(ValidationError::Negative {
            field: "salary".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates a position before create/update.
///
/// ## Rules
/// - `id` present
/// - `name` non-empty, at most 200 characters
/// - `salary` not negative
pub fn validate_position(position: &Position) -> ValidationResult<()> {
    validate_id("id", &position.id)?;
    validate_text("name", &position.name, MAX_POSITION_NAME_LEN)?;
    validate_salary(position.salary)
}

/// Validates an employee before create/update.
///
/// Only checks that `position_id` is present; whether it resolves is the
/// repository's referential-integrity check.
pub fn validate_employee(employee: &Employee) -> ValidationResult<()> {
    validate_id("id", &employee.id)?;
    validate_text("first_name", &employee.first_name, MAX_PERSON_NAME_LEN)?;
    validate_text("last_name", &employee.last_name, MAX_PERSON_NAME_LEN)?;
    validate_id("position_id", &employee.position_id)
}

// =============================================================================
// Unit Tests
// =============================================================================
