//! # Roster API
//!
//! REST and gRPC front ends over the roster repositories.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Roster API                                    │
//! │                                                                         │
//! │  ┌────────────────────────┐          ┌────────────────────────────┐    │
//! │  │  REST (axum, 8080)     │          │  gRPC (tonic, 50051)       │    │
//! │  │                        │          │                            │    │
//! │  │  MiddlewareChain       │          │  AuthInterceptor           │    │
//! │  │  • correlation         │          │  • correlation             │    │
//! │  │  • logging / timing    │          │  • bearer JWT              │    │
//! │  │  • bearer JWT          │          │  RpcCall                   │    │
//! │  │  • response cache      │          │  • logging / timing        │    │
//! │  └───────────┬────────────┘          └─────────────┬──────────────┘    │
//! │              │                                     │                    │
//! │              └──────────────┬──────────────────────┘                    │
//! │                             ▼                                           │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  AppState: Arc<dyn PositionRepository>, Arc<dyn EmployeeRepo..>  │  │
//! │  │            memory │ PostgreSQL │ MongoDB   (+ Redis cache)       │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`] for the environment variables.

pub mod auth;
pub mod config;
pub mod error;
pub mod grpc;
pub mod middleware;
pub mod proto;
pub mod rest;

use std::sync::Arc;

use roster_core::{EmployeeRepository, PositionRepository};
use roster_db::Repositories;

// Re-exports
pub use auth::JwtManager;
pub use config::ApiConfig;
pub use error::ApiError;

use crate::middleware::ResponseCache;

/// Shared application state, cloned into every handler and service.
#[derive(Clone)]
pub struct AppState {
    pub positions: Arc<dyn PositionRepository>,
    pub employees: Arc<dyn EmployeeRepository>,
    pub jwt: Arc<JwtManager>,
    pub response_cache: Option<ResponseCache>,
}

impl AppState {
    pub fn new(repositories: Repositories, jwt: JwtManager) -> Self {
        let response_cache = repositories
            .response_cache
            .map(|store| ResponseCache::new(store, repositories.cache_ttl));

        AppState {
            positions: repositories.positions,
            employees: repositories.employees,
            jwt: Arc::new(jwt),
            response_cache,
        }
    }
}
