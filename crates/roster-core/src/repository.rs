//! # Repository Contracts
//!
//! Storage-agnostic traits implemented by every backend.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Contracts                                 │
//! │                                                                         │
//! │  Controller / gRPC service                                             │
//! │       │                                                                 │
//! │       │  Arc<dyn PositionRepository>, Arc<dyn EmployeeRepository>      │
//! │       ▼                                                                 │
//! │  ┌──────────────────┐   optional   ┌─────────────────────────────┐     │
//! │  │ Cached*Repository│─────────────►│ Memory* / Pg* / Mongo*      │     │
//! │  │ (cache-aside)    │              │ Repository (backend)        │     │
//! │  └──────────────────┘              └─────────────────────────────┘     │
//! │                                                                         │
//! │  Employee create/update ──► PositionRepository::get   (must exist)     │
//! │  Position delete        ──► EmployeeLookup::get_by_position (must not) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Contract Semantics (identical across backends)
//!
//! | Operation | Missing ID | Duplicate ID | No-op write |
//! |-----------|------------|--------------|-------------|
//! | create    | -          | AlreadyExists| -           |
//! | get       | NotFound   | -            | -           |
//! | update    | NotFound   | -            | NothingChanged |
//! | delete    | NotFound   | -            | -           |
//!
//! `get_all` returns the requested page ordered by `id`; a page past the end
//! is empty. Every call is bounded by the backend's timeout.

use async_trait::async_trait;

use crate::error::RepoResult;
use crate::pagination::Page;
use crate::types::{Employee, Position};

/// Contract for storing positions.
#[async_trait]
pub trait PositionRepository: Send + Sync {
    /// Stores a new position and returns it as stored.
    async fn create(&self, position: Position) -> RepoResult<Position>;

    /// Fetches a position by ID.
    async fn get(&self, id: &str) -> RepoResult<Position>;

    /// Replaces the mutable fields of an existing position.
    async fn update(&self, position: Position) -> RepoResult<()>;

    /// Deletes a position.
    ///
    /// Fails with `ReferenceInUse` while any employee references it.
    async fn delete(&self, id: &str) -> RepoResult<()>;

    /// Returns one page of positions ordered by ID.
    async fn get_all(&self, page: Page) -> RepoResult<Vec<Position>>;
}

/// Lookup of employees by the position they hold.
///
/// This is the only part of the employee store a position repository needs
/// (for its delete guard), so backends provide it as a separate handle over
/// the same storage.
#[async_trait]
pub trait EmployeeLookup: Send + Sync {
    /// Returns any one employee holding `position_id`, or NotFound.
    async fn get_by_position(&self, position_id: &str) -> RepoResult<Employee>;
}

/// Contract for storing employees.
///
/// Implementations resolve `employee.position_id` through a
/// [`PositionRepository`] before every create and update.
#[async_trait]
pub trait EmployeeRepository: EmployeeLookup {
    /// Stores a new employee and returns it as stored.
    async fn create(&self, employee: Employee) -> RepoResult<Employee>;

    /// Fetches an employee by ID.
    async fn get(&self, id: &str) -> RepoResult<Employee>;

    /// Replaces the mutable fields of an existing employee.
    async fn update(&self, employee: Employee) -> RepoResult<()>;

    /// Deletes an employee.
    async fn delete(&self, id: &str) -> RepoResult<()>;

    /// Returns one page of employees ordered by ID.
    async fn get_all(&self, page: Page) -> RepoResult<Vec<Employee>>;
}
