// ABOUTME: Server bootstrap for Parkshare: logging, storage selection and the HTTP listener
// ABOUTME: The binary parses flags and hands a resolved Config to run_server

use axum::http::{HeaderValue, Method};
use axum::Router;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use parkshare_api::{create_router, AppState};
use parkshare_storage::{ParkingStore, StorageError, StorageFactory};

pub mod config;

pub use config::{Config, ConfigError};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Storage initialization failed: {0}")]
    Storage(#[from] StorageError),
    #[error("Invalid CORS origin: {0}")]
    InvalidCorsOrigin(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Compact tracing output filtered by `RUST_LOG` (default `info`)
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();
}

/// The full API with per-request tracing and CORS for the dashboard origin
pub fn build_app(store: Arc<dyn ParkingStore>, cors_origin: &str) -> Result<Router, ServerError> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .map_err(|_| ServerError::InvalidCorsOrigin(cors_origin.to_string()))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Ok(create_router(AppState::new(store))
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}

pub async fn run_server(config: Config) -> Result<(), ServerError> {
    let store = StorageFactory::create_storage(config.storage_config()).await?;
    let app = build_app(store, &config.cors_origin)?;

    let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
    info!("Parkshare API listening on http://{}", listener.local_addr()?);
    info!("CORS origin: {}", config.cors_origin);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Unable to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use parkshare_storage::MemoryStore;
    use tower::ServiceExt;

    fn memory_store() -> Arc<dyn ParkingStore> {
        Arc::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn test_app_serves_health_with_cors_header() {
        let app = build_app(memory_store(), "http://localhost:5173").unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("origin", "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:5173"
        );
    }

    #[test]
    fn test_invalid_cors_origin_is_rejected() {
        let result = build_app(memory_store(), "http://bad\norigin");
        assert!(matches!(result, Err(ServerError::InvalidCorsOrigin(_))));
    }

    #[tokio::test]
    async fn test_sqlite_storage_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            host: "127.0.0.1".parse().unwrap(),
            port: 4100,
            cors_origin: "http://localhost:5173".to_string(),
            database_path: Some(dir.path().join("parkshare.db")),
            database_max_connections: 2,
        };

        let store = StorageFactory::create_storage(config.storage_config())
            .await
            .unwrap();
        assert_eq!(store.backend().as_str(), "sqlite");
        assert!(dir.path().join("parkshare.db").exists());
    }
}
