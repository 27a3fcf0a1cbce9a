//! # Domain Types
//!
//! The two entities Roster stores.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐           ┌─────────────────┐                      │
//! │  │    Position     │  1     *  │    Employee     │                      │
//! │  │  ─────────────  │◄──────────│  ─────────────  │                      │
//! │  │  id (UUID)      │           │  id (UUID)      │                      │
//! │  │  name           │           │  first_name     │                      │
//! │  │  salary         │           │  last_name      │                      │
//! │  └─────────────────┘           │  position_id(FK)│                      │
//! │                                └─────────────────┘                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! IDs are UUID v4 strings generated server-side ([`generate_id`]). Clients
//! never choose an ID; update and delete address an entity by the ID it was
//! given at creation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a new entity ID.
///
/// ## Usage
/// ```rust
/// let id = roster_core::generate_id();
/// assert_eq!(id.len(), 36);
/// ```
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Position
// =============================================================================

/// A job position employees can hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Position {
    /// Unique identifier (UUID v4).
    #[serde(default)]
    pub id: String,

    /// Display name, e.g. "Engineer".
    pub name: String,

    /// Salary in whole currency units.
    pub salary: i64,
}

impl Position {
    /// Creates a position with a freshly generated ID.
    pub fn new(name: impl Into<String>, salary: i64) -> Self {
        Position {
            id: generate_id(),
            name: name.into(),
            salary,
        }
    }
}

// =============================================================================
// Employee
// =============================================================================

/// A person holding exactly one position.
///
/// `position_id` must name an existing [`Position`] whenever the employee is
/// written; repositories reject the write otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Employee {
    /// Unique identifier (UUID v4).
    #[serde(default)]
    pub id: String,

    #[serde(alias = "firstname")]
    pub first_name: String,

    #[serde(alias = "lastname")]
    pub last_name: String,

    /// ID of the referenced position.
    pub position_id: String,
}

impl Employee {
    /// Creates an employee with a freshly generated ID.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        position_id: impl Into<String>,
    ) -> Self {
        Employee {
            id: generate_id(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            position_id: position_id.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
