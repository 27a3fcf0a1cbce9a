//! Roster API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. Backend-specific variables are only read (and only required)
//! for the backend `DATABASE_TYPE` selects.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `ADDRESS` | `0.0.0.0` |
//! | `REST_PORT` / `GRPC_PORT` | `8080` / `50051` |
//! | `JWT_TOKEN_SECRET` | required |
//! | `DATABASE_TYPE` | `postgres` (`mongo`, `memory`) |
//! | `REQUEST_TIMEOUT_SECS` | `5` |
//! | `POSTGRES_HOST`, `POSTGRES_NAME` | required for postgres |
//! | `MONGO_HOST`, `MONGO_NAME` | required for mongo |
//! | `REDIS_HOST` | unset disables the cache |
//! | `REDIS_TTL` | `5` (hours) |

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use roster_db::{Backend, BackendKind, MongoConfig, PostgresConfig, RedisConfig, StorageConfig};

/// Roster API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface both servers bind to
    pub address: IpAddr,

    /// REST server port
    pub rest_port: u16,

    /// gRPC server port
    pub grpc_port: u16,

    /// HMAC secret for bearer tokens
    pub jwt_secret: String,

    /// Backend, per-call timeout and cache
    pub storage: StorageConfig,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup: &lookup };

        let jwt_secret = env.required("JWT_TOKEN_SECRET")?;

        let kind: BackendKind = env.parse_or("DATABASE_TYPE", BackendKind::Postgres)?;
        let backend = match kind {
            BackendKind::Memory => Backend::Memory,
            BackendKind::Postgres => Backend::Postgres(postgres_config(&env)?),
            BackendKind::Mongo => Backend::Mongo(mongo_config(&env)?),
        };

        let timeout = Duration::from_secs(env.parse_or("REQUEST_TIMEOUT_SECS", 5)?);
        let mut storage = StorageConfig::new(backend).timeout(timeout);
        if let Some(redis) = redis_config(&env)? {
            storage = storage.cache(redis);
        }

        Ok(ApiConfig {
            address: env.parse_or("ADDRESS", IpAddr::from([0, 0, 0, 0]))?,
            rest_port: env.parse_or("REST_PORT", 8080)?,
            grpc_port: env.parse_or("GRPC_PORT", 50051)?,
            jwt_secret,
            storage,
        })
    }

    pub fn rest_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.rest_port)
    }

    pub fn grpc_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.grpc_port)
    }
}

struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingRequired(key.to_string()))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string())),
            None => Ok(default),
        }
    }
}

fn postgres_config(env: &Env<'_>) -> Result<PostgresConfig, ConfigError> {
    Ok(
        PostgresConfig::new(env.required("POSTGRES_HOST")?, env.required("POSTGRES_NAME")?)
            .port(env.parse_or("POSTGRES_PORT", 5432)?)
            .credentials(env.or("POSTGRES_USER", "postgres"), env.or("POSTGRES_PASSWORD", ""))
            .max_connections(env.parse_or("POSTGRES_MAX_CONNECTIONS", 10)?)
            .connect_timeout(Duration::from_secs(env.parse_or("POSTGRES_TIMEOUT", 5)?)),
    )
}

fn mongo_config(env: &Env<'_>) -> Result<MongoConfig, ConfigError> {
    Ok(
        MongoConfig::new(env.required("MONGO_HOST")?, env.required("MONGO_NAME")?)
            .port(env.parse_or("MONGO_PORT", 27017)?)
            .credentials(env.or("MONGO_USER", ""), env.or("MONGO_PASSWORD", ""))
            .collections(
                env.or("POSITIONS_COLLECTION", "positions"),
                env.or("EMPLOYEES_COLLECTION", "employees"),
            )
            .max_pool_size(env.parse_or("MONGO_MAX_POOL_SIZE", 10)?)
            .connect_timeout(Duration::from_secs(env.parse_or("MONGO_TIMEOUT", 5)?)),
    )
}

fn redis_config(env: &Env<'_>) -> Result<Option<RedisConfig>, ConfigError> {
    let Some(host) = env.get("REDIS_HOST") else {
        return Ok(None);
    };

    let ttl_secs = env
        .parse_or::<u64>("REDIS_TTL", 5)?
        .checked_mul(60 * 60)
        .ok_or_else(|| ConfigError::InvalidValue("REDIS_TTL".to_string()))?;

    let mut config = RedisConfig::new(host)
        .port(env.parse_or("REDIS_PORT", 6379)?)
        .database(env.parse_or("REDIS_DATABASE", 0)?)
        .timeout(Duration::from_secs(env.parse_or("REDIS_TIMEOUT", 2)?))
        .ttl(Duration::from_secs(ttl_secs));
    if let Some(password) = env.get("REDIS_PASSWORD") {
        config = config.password(password);
    }
    Ok(Some(config))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_memory_defaults() {
        let config = load(&[("JWT_TOKEN_SECRET", "s3cret"), ("DATABASE_TYPE", "memory")]).unwrap();

        assert_eq!(config.rest_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.grpc_port, 50051);
        assert_eq!(config.storage.timeout, Duration::from_secs(5));
        assert!(matches!(config.storage.backend, Backend::Memory));
        assert!(config.storage.cache.is_none());
    }

    #[test]
    fn test_secret_is_required() {
        let err = load(&[("DATABASE_TYPE", "memory")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(ref key) if key == "JWT_TOKEN_SECRET"));
    }

    #[test]
    fn test_postgres_is_default_and_needs_host() {
        let err = load(&[("JWT_TOKEN_SECRET", "s")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(ref key) if key == "POSTGRES_HOST"));

        let config = load(&[
            ("JWT_TOKEN_SECRET", "s"),
            ("POSTGRES_HOST", "db"),
            ("POSTGRES_NAME", "roster"),
            ("POSTGRES_MAX_CONNECTIONS", "25"),
        ])
        .unwrap();
        match config.storage.backend {
            Backend::Postgres(pg) => {
                assert_eq!(pg.host, "db");
                assert_eq!(pg.port, 5432);
                assert_eq!(pg.max_connections, 25);
            }
            other => panic!("expected postgres, got {:?}", other),
        }
    }

    #[test]
    fn test_mongo_collections_and_cache() {
        let config = load(&[
            ("JWT_TOKEN_SECRET", "s"),
            ("DATABASE_TYPE", "mongo"),
            ("MONGO_HOST", "mongo"),
            ("MONGO_NAME", "roster"),
            ("POSITIONS_COLLECTION", "pos"),
            ("REDIS_HOST", "cache"),
            ("REDIS_TTL", "2"),
        ])
        .unwrap();

        match &config.storage.backend {
            Backend::Mongo(mongo) => {
                assert_eq!(mongo.positions_collection, "pos");
                assert_eq!(mongo.employees_collection, "employees");
            }
            other => panic!("expected mongo, got {:?}", other),
        }
        let cache = config.storage.cache.unwrap();
        assert_eq!(cache.host, "cache");
        assert_eq!(cache.ttl, Duration::from_secs(7200));
    }

    #[test]
    fn test_invalid_values() {
        let err = load(&[
            ("JWT_TOKEN_SECRET", "s"),
            ("DATABASE_TYPE", "memory"),
            ("REST_PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "REST_PORT"));

        let err = load(&[("JWT_TOKEN_SECRET", "s"), ("DATABASE_TYPE", "sqlite")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "DATABASE_TYPE"));
    }

    #[test]
    fn test_huge_redis_ttl_rejected() {
        let err = load(&[
            ("JWT_TOKEN_SECRET", "s"),
            ("DATABASE_TYPE", "memory"),
            ("REDIS_HOST", "cache"),
            ("REDIS_TTL", "18446744073709551615"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "REDIS_TTL"));
    }
}
