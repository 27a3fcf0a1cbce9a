//! # Connection Bootstrapping
//!
//! Pool/client creation for every external store Roster can use.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Connection Bootstrapping                           │
//! │                                                                         │
//! │  roster-api startup (ApiConfig)                                        │
//! │       │                                                                 │
//! │       ├── PostgresConfig ──► connect_postgres() ──► PgPool             │
//! │       │                        └── run embedded migrations             │
//! │       │                                                                 │
//! │       ├── MongoConfig ─────► connect_mongo() ─────► mongodb::Database  │
//! │       │                        ├── ping                                 │
//! │       │                        └── unique index on `id`                │
//! │       │                                                                 │
//! │       └── RedisConfig ─────► connect_redis() ─────► ConnectionManager  │
//! │                                                                         │
//! │  All three clients are internally pooled and safe to share.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::{ClientOptions, Credential, IndexOptions, ServerAddress};
use mongodb::{Client, Database, IndexModel};
use redis::aio::ConnectionManager;
use redis::IntoConnectionInfo;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;

// =============================================================================
// PostgreSQL
// =============================================================================

/// PostgreSQL connection settings.
///
/// ## Example
/// ```rust
/// use roster_db::PostgresConfig;
///
/// let config = PostgresConfig::new("localhost", "roster")
///     .credentials("roster", "secret")
///     .max_connections(20);
/// assert_eq!(config.max_connections, 20);
/// ```
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,

    /// Default: 10
    pub max_connections: u32,

    /// Time allowed to establish (or acquire) a connection. Default: 5 seconds
    pub connect_timeout: Duration,

    /// Whether to run migrations on connect. Default: true
    pub run_migrations: bool,
}

impl PostgresConfig {
    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        PostgresConfig {
            host: host.into(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: database.into(),
            max_connections: 10,
            connect_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .application_name("roster")
    }
}

/// Creates the Postgres pool and applies pending migrations.
pub async fn connect_postgres(config: &PostgresConfig) -> DbResult<PgPool> {
    info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        "Connecting to PostgreSQL"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout)
        .connect_with(config.connect_options())
        .await
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

    info!(max_connections = config.max_connections, "PostgreSQL pool created");

    if config.run_migrations {
        migrations::run_migrations(&pool).await?;
    }

    Ok(pool)
}

/// Creates a Postgres pool from a URL (used by the integration tests).
pub async fn connect_postgres_url(url: &str, max_connections: u32) -> DbResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
    migrations::run_migrations(&pool).await?;
    Ok(pool)
}

// =============================================================================
// MongoDB
// =============================================================================

/// MongoDB connection settings.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub host: String,
    pub port: u16,

    /// Empty means no authentication.
    pub user: String,
    pub password: String,
    pub database: String,

    /// Default: "positions"
    pub positions_collection: String,

    /// Default: "employees"
    pub employees_collection: String,

    /// Default: 10
    pub max_pool_size: u32,

    /// Connect and server-selection timeout. Default: 5 seconds
    pub connect_timeout: Duration,
}

impl MongoConfig {
    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        MongoConfig {
            host: host.into(),
            port: 27017,
            user: String::new(),
            password: String::new(),
            database: database.into(),
            positions_collection: "positions".to_string(),
            employees_collection: "employees".to_string(),
            max_pool_size: 10,
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn collections(mut self, positions: impl Into<String>, employees: impl Into<String>) -> Self {
        self.positions_collection = positions.into();
        self.employees_collection = employees.into();
        self
    }

    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = size;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn client_options(&self) -> ClientOptions {
        let mut options = ClientOptions::default();
        options.hosts = vec![ServerAddress::Tcp {
            host: self.host.clone(),
            port: Some(self.port),
        }];
        options.app_name = Some("roster".to_string());
        options.max_pool_size = Some(self.max_pool_size);
        options.connect_timeout = Some(self.connect_timeout);
        options.server_selection_timeout = Some(self.connect_timeout);

        if !self.user.is_empty() {
            let mut credential = Credential::default();
            credential.username = Some(self.user.clone());
            credential.password = Some(self.password.clone());
            options.credential = Some(credential);
        }
        options
    }
}

/// Connects, pings, and ensures the indexes both repositories rely on.
pub async fn connect_mongo(config: &MongoConfig) -> DbResult<Database> {
    info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        "Connecting to MongoDB"
    );

    let client = Client::with_options(config.client_options())?;
    let db = client.database(&config.database);

    db.run_command(doc! { "ping": 1 }).await?;
    debug!("MongoDB ping succeeded");

    ensure_mongo_indexes(&db, config).await?;

    info!(max_pool_size = config.max_pool_size, "MongoDB client ready");
    Ok(db)
}

/// Creates the unique `id` indexes and the `position_id` lookup index.
///
/// `createIndexes` is a no-op for indexes that already exist.
pub async fn ensure_mongo_indexes(db: &Database, config: &MongoConfig) -> DbResult<()> {
    let unique_id = || {
        IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build()
    };

    db.collection::<mongodb::bson::Document>(&config.positions_collection)
        .create_index(unique_id())
        .await?;

    let employees = db.collection::<mongodb::bson::Document>(&config.employees_collection);
    employees.create_index(unique_id()).await?;
    employees
        .create_index(IndexModel::builder().keys(doc! { "position_id": 1 }).build())
        .await?;

    Ok(())
}

// =============================================================================
// Redis
// =============================================================================

/// Redis connection settings for the cache layer.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub database: i64,

    /// Connect timeout, also applied to every cache command. Default: 2 seconds
    pub timeout: Duration,

    /// Entry lifetime. Default: 5 hours
    pub ttl: Duration,
}

impl RedisConfig {
    pub fn new(host: impl Into<String>) -> Self {
        RedisConfig {
            host: host.into(),
            port: 6379,
            password: None,
            database: 0,
            timeout: Duration::from_secs(2),
            ttl: Duration::from_secs(5 * 60 * 60),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn database(mut self, database: i64) -> Self {
        self.database = database;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Opens a reconnecting Redis connection.
pub async fn connect_redis(config: &RedisConfig) -> DbResult<ConnectionManager> {
    info!(host = %config.host, port = config.port, db = config.database, "Connecting to Redis");

    let mut connection_info = (config.host.as_str(), config.port)
        .into_connection_info()
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
    connection_info.redis.db = config.database;
    connection_info.redis.password = config.password.clone();

    let client = redis::Client::open(connection_info)
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

    let manager = tokio::time::timeout(config.timeout, ConnectionManager::new(client))
        .await
        .map_err(|_| DbError::ConnectionFailed("Redis connect timed out".to_string()))?
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

    info!(ttl_secs = config.ttl.as_secs(), "Redis cache connected");
    Ok(manager)
}

// =============================================================================
// Unit Tests
// =============================================================================
