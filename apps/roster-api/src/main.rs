//! # Roster API server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  client ───► REST (8080) ──┐                                            │
//! │                            ├──► repositories ───► memory/Postgres/Mongo │
//! │  client ───► gRPC (50051) ─┘          │                                 │
//! │                                       ▼                                 │
//! │                                 Redis (optional)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tokio::net::TcpListener;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

use roster_api::{grpc, rest, ApiConfig, AppState, JwtManager};
use roster_db::build_repositories;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting Roster API server...");

    // Load configuration
    let config = ApiConfig::load()?;
    info!(
        backend = %config.storage.backend.kind(),
        cache = config.storage.cache.is_some(),
        rest = %config.rest_addr(),
        grpc = %config.grpc_addr(),
        "Configuration loaded"
    );

    // Connect storage
    let repositories = build_repositories(&config.storage).await?;
    let state = AppState::new(repositories, JwtManager::new(config.jwt_secret.clone()));

    // REST
    let listener = TcpListener::bind(config.rest_addr()).await?;
    let rest_server = axum::serve(listener, rest::router(state.clone()))
        .with_graceful_shutdown(shutdown_signal());
    info!(addr = %config.rest_addr(), "Starting REST server");

    // gRPC
    let grpc_server = Server::builder()
        .add_service(grpc::position_server(&state))
        .add_service(grpc::employee_server(&state))
        .serve_with_shutdown(config.grpc_addr(), shutdown_signal());
    info!(addr = %config.grpc_addr(), "Starting gRPC server");

    tokio::try_join!(
        async { rest_server.await.map_err(anyhow::Error::from) },
        async { grpc_server.await.map_err(anyhow::Error::from) },
    )?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
