//! # roster-db: Storage Layer for Roster
//!
//! This crate implements the roster-core repository contracts over three
//! interchangeable engines and adds an optional Redis cache in front.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Roster Data Flow                                 │
//! │                                                                         │
//! │  REST handler / gRPC service                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     roster-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │    factory    │    │  repository   │    │    cache     │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ StorageConfig │───►│ memory        │◄───│ Cached*Repo  │  │   │
//! │  │   │ Repositories  │    │ postgres      │    │ RedisCache   │  │   │
//! │  │   │               │    │ mongo         │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │          │                    │                                 │   │
//! │  │          ▼                    ▼                                 │   │
//! │  │   pool (connect_*)     integrity + timeout                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PostgreSQL  /  MongoDB  /  Redis                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`factory`] - Backend selection and wiring
//! - [`repository`] - Memory, Postgres and MongoDB repositories
//! - [`cache`] - Cache-aside wrappers and the Redis store
//! - [`integrity`] - Position → Employee reference checks
//! - [`pool`] - Connection bootstrapping
//! - [`migrations`] - Embedded Postgres migrations
//! - [`timeout`] - Per-call deadline
//! - [`error`] - Driver error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use roster_db::{build_repositories, Backend, PostgresConfig, StorageConfig};
//!
//! let config = StorageConfig::new(Backend::Postgres(PostgresConfig::new("localhost", "roster")));
//! let repos = build_repositories(&config).await?;
//!
//! let position = repos.positions.create(Position::new("Engineer", 1000)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache;
pub mod error;
pub mod factory;
pub mod integrity;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod timeout;

// =============================================================================
// Re-exports
// =============================================================================

pub use cache::{CacheError, CacheStore, CachedEmployeeRepository, CachedPositionRepository, RedisCache};
pub use error::{DbError, DbResult};
pub use factory::{build_repositories, Backend, BackendKind, CacheLayer, Repositories, StorageConfig};
pub use pool::{MongoConfig, PostgresConfig, RedisConfig};
pub use repository::memory::MemoryStore;
pub use timeout::DEFAULT_TIMEOUT;
