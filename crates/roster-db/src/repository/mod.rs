//! # Repository Module
//!
//! Backend implementations of the roster-core repository contracts.
//!
//! ## Backends
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Contract, Three Engines                          │
//! │                                                                         │
//! │  Arc<dyn PositionRepository> / Arc<dyn EmployeeRepository>             │
//! │       │                                                                 │
//! │       ├── memory    MemoryStore (BTreeMaps behind one Mutex)           │
//! │       ├── postgres  sqlx PgPool, FK ON DELETE RESTRICT                 │
//! │       └── mongo     one collection per entity, unique index on id      │
//! │                                                                         │
//! │  Observable behavior is identical: same errors for duplicate IDs,      │
//! │  missing IDs, no-op updates, dangling references and pagination.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`memory::MemoryStore`] - Position/Employee repositories sharing one lock
//! - [`postgres::PgPositionRepository`], [`postgres::PgEmployeeRepository`]
//! - [`mongo::MongoPositionRepository`], [`mongo::MongoEmployeeRepository`]

pub mod memory;
pub mod mongo;
pub mod postgres;
