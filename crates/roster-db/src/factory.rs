//! # Backend Factory
//!
//! Picks a storage engine from configuration and wires the two repositories
//! (plus the optional cache) together.
//!
//! ## Wiring
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   EmployeeLookup (backend) ──────────► PositionRepository (backend)     │
//! │                                              │                          │
//! │                                   cache? ──► CachedPositionRepository   │
//! │                                              │                          │
//! │                                              ▼  (integrity checks)      │
//! │                                      EmployeeRepository (backend)       │
//! │                                              │                          │
//! │                                   cache? ──► CachedEmployeeRepository   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The position repository only needs the lookup half of the employee store,
//! so nothing here is cyclic.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use roster_core::{EmployeeLookup, EmployeeRepository, PositionRepository};
use tracing::info;

use crate::cache::{CacheStore, CachedEmployeeRepository, CachedPositionRepository, RedisCache};
use crate::error::DbResult;
use crate::pool::{connect_mongo, connect_postgres, connect_redis, MongoConfig, PostgresConfig, RedisConfig};
use crate::repository::memory::MemoryStore;
use crate::repository::mongo::{MongoEmployeeLookup, MongoEmployeeRepository, MongoPositionRepository};
use crate::repository::postgres::{PgEmployeeLookup, PgEmployeeRepository, PgPositionRepository};
use crate::timeout::DEFAULT_TIMEOUT;

/// Namespace for the HTTP response cache sharing the Redis connection.
pub const RESPONSE_CACHE_NAMESPACE: &str = "response:";

/// Storage engine names accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Postgres,
    Mongo,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "inmemory" => Ok(BackendKind::Memory),
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            "mongo" | "mongodb" => Ok(BackendKind::Mongo),
            other => Err(format!(
                "unknown database type '{}' (expected postgres, mongo or memory)",
                other
            )),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Memory => "memory",
            BackendKind::Postgres => "postgres",
            BackendKind::Mongo => "mongo",
        };
        f.write_str(name)
    }
}

/// Selected backend with its connection settings.
#[derive(Debug, Clone)]
pub enum Backend {
    Memory,
    Postgres(PostgresConfig),
    Mongo(MongoConfig),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Memory => BackendKind::Memory,
            Backend::Postgres(_) => BackendKind::Postgres,
            Backend::Mongo(_) => BackendKind::Mongo,
        }
    }
}

/// Everything [`build_repositories`] needs.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: Backend,

    /// Deadline for each repository call.
    pub timeout: Duration,

    /// Cache layer; `None` disables caching.
    pub cache: Option<RedisConfig>,
}

impl StorageConfig {
    pub fn new(backend: Backend) -> Self {
        StorageConfig {
            backend,
            timeout: DEFAULT_TIMEOUT,
            cache: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache(mut self, cache: RedisConfig) -> Self {
        self.cache = Some(cache);
        self
    }
}

/// The wired repositories handed to the transports.
#[derive(Clone)]
pub struct Repositories {
    pub positions: Arc<dyn PositionRepository>,
    pub employees: Arc<dyn EmployeeRepository>,

    /// Raw byte store for the HTTP response cache, present iff caching is on.
    pub response_cache: Option<Arc<dyn CacheStore>>,

    /// Entry lifetime shared by every cache.
    pub cache_ttl: Duration,
}

/// Cache handles for [`Repositories::wire`], usually built from one Redis
/// connection.
pub struct CacheLayer {
    pub positions: Arc<dyn CacheStore>,
    pub employees: Arc<dyn CacheStore>,
    pub responses: Arc<dyn CacheStore>,
    pub ttl: Duration,
}

impl Repositories {
    /// Repositories over a fresh in-memory store, without caching.
    pub fn in_memory() -> Self {
        let store = MemoryStore::new();
        Repositories {
            positions: Arc::new(store.positions()),
            employees: Arc::new(store.employees()),
            response_cache: None,
            cache_ttl: Duration::ZERO,
        }
    }

    /// Wires backend repositories, inserting the cache layer when given.
    ///
    /// `employees` builds the backend employee repository around the
    /// position repository it must use for integrity checks. That is always
    /// the uncached backend: a stale cache entry must never let an employee
    /// reference a deleted position.
    pub fn wire<E>(
        positions: Arc<dyn PositionRepository>,
        caches: Option<CacheLayer>,
        employees: E,
    ) -> Self
    where
        E: FnOnce(Arc<dyn PositionRepository>) -> Arc<dyn EmployeeRepository>,
    {
        let backend_employees = employees(positions.clone());

        match caches {
            None => Repositories {
                positions,
                employees: backend_employees,
                response_cache: None,
                cache_ttl: Duration::ZERO,
            },
            Some(caches) => Repositories {
                positions: Arc::new(CachedPositionRepository::new(positions, caches.positions, caches.ttl)),
                employees: Arc::new(CachedEmployeeRepository::new(
                    backend_employees,
                    caches.employees,
                    caches.ttl,
                )),
                response_cache: Some(caches.responses),
                cache_ttl: caches.ttl,
            },
        }
    }
}

/// Connects the configured backend (and cache) and returns the repositories.
///
/// ## Errors
/// Any connection, ping, index or migration failure is returned; the
/// server should refuse to start.
pub async fn build_repositories(config: &StorageConfig) -> DbResult<Repositories> {
    let caches = match &config.cache {
        Some(redis) => {
            let conn = connect_redis(redis).await?;
            Some(CacheLayer {
                positions: Arc::new(RedisCache::new(conn.clone(), "position:", redis.timeout)),
                employees: Arc::new(RedisCache::new(conn.clone(), "employee:", redis.timeout)),
                responses: Arc::new(RedisCache::new(conn, RESPONSE_CACHE_NAMESPACE, redis.timeout)),
                ttl: redis.ttl,
            })
        }
        None => None,
    };

    info!(
        backend = %config.backend.kind(),
        cache = caches.is_some(),
        timeout_ms = config.timeout.as_millis() as u64,
        "Building repositories"
    );

    let timeout = config.timeout;
    let repositories = match &config.backend {
        Backend::Memory => {
            let store = MemoryStore::new();
            Repositories::wire(Arc::new(store.positions()), caches, move |_| {
                Arc::new(store.employees())
            })
        }

        Backend::Postgres(pg) => {
            let pool = connect_postgres(pg).await?;
            let lookup: Arc<dyn EmployeeLookup> = Arc::new(PgEmployeeLookup::new(pool.clone(), timeout));
            let positions = Arc::new(PgPositionRepository::new(pool.clone(), lookup, timeout));
            Repositories::wire(positions, caches, move |positions| {
                Arc::new(PgEmployeeRepository::new(pool, positions, timeout))
            })
        }

        Backend::Mongo(mongo) => {
            let db = connect_mongo(mongo).await?;
            let lookup: Arc<dyn EmployeeLookup> =
                Arc::new(MongoEmployeeLookup::new(&db, &mongo.employees_collection, timeout));
            let positions = Arc::new(MongoPositionRepository::new(
                &db,
                &mongo.positions_collection,
                lookup,
                timeout,
            ));
            let employees_collection = mongo.employees_collection.clone();
            Repositories::wire(positions, caches, move |positions| {
                Arc::new(MongoEmployeeRepository::new(&db, &employees_collection, positions, timeout))
            })
        }
    };

    Ok(repositories)
}
