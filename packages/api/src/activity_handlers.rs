// ABOUTME: HTTP request handlers for the activity feed and dashboard counters
// ABOUTME: Read-only views derived from the entity store

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Response,
};
use serde::Deserialize;
use tracing::info;

use parkshare_core::activity_log_limit;

use crate::error::ApiResult;
use crate::response::ok;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityLogQuery {
    pub limit: Option<usize>,
}

/// Most recent activity first
pub async fn list_activity_logs(
    State(state): State<AppState>,
    query: Result<Query<ActivityLogQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let limit = activity_log_limit(query.limit);
    info!("Listing activity logs (limit: {})", limit);

    let logs = state.store.list_activity_logs(limit).await?;
    Ok(ok(logs))
}

pub async fn get_dashboard_stats(State(state): State<AppState>) -> ApiResult<Response> {
    info!("Getting dashboard stats");

    let stats = state.store.get_dashboard_stats().await?;
    Ok(ok(stats))
}
