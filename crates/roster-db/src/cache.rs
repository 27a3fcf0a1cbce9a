//! # Cache Layer
//!
//! Cache-aside wrappers that sit in front of any backend repository.
//!
//! ## Read / Write Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cache-Aside                                      │
//! │                                                                         │
//! │  get(id)                                                               │
//! │    ├── cache GET key ── hit ──► return (backend untouched)             │
//! │    └── miss / error ──► backend.get(id) ──► best-effort SET key        │
//! │                                                                         │
//! │  create / update                                                       │
//! │    └── backend first ──► best-effort SET key value EX ttl              │
//! │                                                                         │
//! │  delete                                                                │
//! │    └── backend first ──► best-effort DEL key                           │
//! │                                                                         │
//! │  get_all / get_by_position ──► backend (uncached)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cache failures are logged at `warn` and never returned to the caller;
//! the backend result is always authoritative.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use roster_core::{
    Employee, EmployeeLookup, EmployeeRepository, Page, Position, PositionRepository, RepoResult,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

// =============================================================================
// Errors
// =============================================================================

/// Cache failures. Logged by the wrappers, never propagated.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("cache command timed out after {0:?}")]
    Timeout(Duration),
}

// =============================================================================
// Cache Store
// =============================================================================

/// A key/value store with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// [`CacheStore`] over Redis.
///
/// Keys are prefixed with `namespace`, so several caches can share one
/// connection without colliding.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    namespace: String,
    timeout: Duration,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager, namespace: impl Into<String>, timeout: Duration) -> Self {
        RedisCache {
            conn,
            namespace: namespace.into(),
            timeout,
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    async fn run<T, F>(&self, fut: F) -> Result<T, CacheError>
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CacheError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        self.run(async move { conn.get::<_, Option<Vec<u8>>>(key).await })
            .await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        let value = value.to_vec();
        let seconds = ttl.as_secs().max(1);
        self.run(async move { conn.set_ex::<_, _, ()>(key, value, seconds).await })
            .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        self.run(async move { conn.del::<_, ()>(key).await }).await
    }
}

// =============================================================================
// Entity Cache
// =============================================================================

/// JSON encoding plus best-effort semantics over a [`CacheStore`].
#[derive(Clone)]
struct EntityCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    entity: &'static str,
}

impl EntityCache {
    async fn load<T: DeserializeOwned>(&self, id: &str) -> Option<T> {
        let bytes = match self.store.get(id).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(entity = self.entity, id, error = %e, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                debug!(entity = self.entity, id, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(entity = self.entity, id, error = %e, "Cached value undecodable");
                None
            }
        }
    }

    async fn store<T: Serialize + Sync>(&self, id: &str, value: &T) {
        let result = match serde_json::to_vec(value) {
            Ok(bytes) => self.store.set(id, &bytes, self.ttl).await,
            Err(e) => Err(CacheError::from(e)),
        };
        if let Err(e) = result {
            warn!(entity = self.entity, id, error = %e, "Cache write failed");
        }
    }

    async fn invalidate(&self, id: &str) {
        if let Err(e) = self.store.delete(id).await {
            warn!(entity = self.entity, id, error = %e, "Cache invalidation failed");
        }
    }
}

// =============================================================================
// Cached Repositories
// =============================================================================

/// Cache-aside [`PositionRepository`].
#[derive(Clone)]
pub struct CachedPositionRepository {
    inner: Arc<dyn PositionRepository>,
    cache: EntityCache,
}

impl CachedPositionRepository {
    pub fn new(inner: Arc<dyn PositionRepository>, store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        CachedPositionRepository {
            inner,
            cache: EntityCache {
                store,
                ttl,
                entity: "position",
            },
        }
    }
}

#[async_trait]
impl PositionRepository for CachedPositionRepository {
    async fn create(&self, position: Position) -> RepoResult<Position> {
        let created = self.inner.create(position).await?;
        self.cache.store(&created.id, &created).await;
        Ok(created)
    }

    async fn get(&self, id: &str) -> RepoResult<Position> {
        if let Some(position) = self.cache.load::<Position>(id).await {
            return Ok(position);
        }
        let position = self.inner.get(id).await?;
        self.cache.store(id, &position).await;
        Ok(position)
    }

    async fn update(&self, position: Position) -> RepoResult<()> {
        self.inner.update(position.clone()).await?;
        self.cache.store(&position.id, &position).await;
        Ok(())
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        self.inner.delete(id).await?;
        self.cache.invalidate(id).await;
        Ok(())
    }

    async fn get_all(&self, page: Page) -> RepoResult<Vec<Position>> {
        self.inner.get_all(page).await
    }
}

/// Cache-aside [`EmployeeRepository`].
#[derive(Clone)]
pub struct CachedEmployeeRepository {
    inner: Arc<dyn EmployeeRepository>,
    cache: EntityCache,
}

impl CachedEmployeeRepository {
    pub fn new(inner: Arc<dyn EmployeeRepository>, store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        CachedEmployeeRepository {
            inner,
            cache: EntityCache {
                store,
                ttl,
                entity: "employee",
            },
        }
    }
}

#[async_trait]
impl EmployeeLookup for CachedEmployeeRepository {
    async fn get_by_position(&self, position_id: &str) -> RepoResult<Employee> {
        self.inner.get_by_position(position_id).await
    }
}

#[async_trait]
impl EmployeeRepository for CachedEmployeeRepository {
    async fn create(&self, employee: Employee) -> RepoResult<Employee> {
        let created = self.inner.create(employee).await?;
        self.cache.store(&created.id, &created).await;
        Ok(created)
    }

    async fn get(&self, id: &str) -> RepoResult<Employee> {
        if let Some(employee) = self.cache.load::<Employee>(id).await {
            return Ok(employee);
        }
        let employee = self.inner.get(id).await?;
        self.cache.store(id, &employee).await;
        Ok(employee)
    }

    async fn update(&self, employee: Employee) -> RepoResult<()> {
        self.inner.update(employee.clone()).await?;
        self.cache.store(&employee.id, &employee).await;
        Ok(())
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        self.inner.delete(id).await?;
        self.cache.invalidate(id).await;
        Ok(())
    }

    async fn get_all(&self, page: Page) -> RepoResult<Vec<Employee>> {
        self.inner.get_all(page).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
