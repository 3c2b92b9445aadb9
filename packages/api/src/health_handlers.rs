use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use parkshare_storage::StorageBackend;

use crate::AppState;

/// Liveness plus the storage backend in use and whether the database answers
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let backend = state.store.backend();
    let database = match backend {
        StorageBackend::Memory => "not-applicable",
        StorageBackend::Sqlite => match state.store.ping().await {
            Ok(()) => "connected",
            Err(e) => {
                warn!("Database ping failed: {}", e);
                "unavailable"
            }
        },
    };

    let (status_code, status) = if database == "unavailable" {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "storage": backend.as_str(),
            "database": database,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}
