//! # roster-core: Domain Model for Roster
//!
//! This crate is the **heart** of Roster. It holds the two entities, their
//! validation rules, the error taxonomy, and the storage-agnostic repository
//! contracts that every backend implements.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Roster Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              roster-api (REST + gRPC transport)                 │   │
//! │  │   middleware chain ──► controllers ──► Arc<dyn ...Repository>   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ roster-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌────────────┐  ┌───────────┐  ┌───────────┐ │   │
//! │  │   │   types   │  │ repository │  │pagination │  │validation │ │   │
//! │  │   │ Position  │  │ contracts  │  │   Page    │  │   rules   │ │   │
//! │  │   │ Employee  │  │            │  │           │  │           │ │   │
//! │  │   └───────────┘  └────────────┘  └───────────┘  └───────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              roster-db (memory / Postgres / MongoDB / Redis)    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - `Position` and `Employee`
//! - [`repository`] - Repository contracts shared by all backends
//! - [`pagination`] - `Page` (1-based page number + page size)
//! - [`error`] - `RepoError` taxonomy and `ValidationError`
//! - [`validation`] - Field rules checked before any storage access
//!
//! ## Example Usage
//!
//! ```rust
//! use roster_core::{Page, Position};
//!
//! let position = Position::new("Engineer", 1000);
//! assert!(!position.id.is_empty());
//!
//! let page = Page::new(2, 50).unwrap();
//! assert_eq!(page.offset(), 50);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod pagination;
pub mod repository;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{RepoError, RepoResult, ValidationError};
pub use pagination::Page;
pub use repository::{EmployeeLookup, EmployeeRepository, PositionRepository};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Page size used by transports when the caller omits one.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Upper bound on a single page.
///
/// Keeps one `GetAll` call from pulling an entire table into memory.
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Maximum length of a position name.
pub const MAX_POSITION_NAME_LEN: usize = 200;

/// Maximum length of an employee first or last name.
pub const MAX_PERSON_NAME_LEN: usize = 100;
