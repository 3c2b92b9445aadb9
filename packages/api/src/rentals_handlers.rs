// ABOUTME: HTTP request handlers for rental operations
// ABOUTME: Creating and ending rentals drives the parking space status

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::Response,
    Json,
};
use chrono::Local;
use serde::Deserialize;
use tracing::info;

use parkshare_core::{
    validate_rental_create, validate_rental_update, RentalCreateInput, RentalFilter,
    RentalUpdateInput, DEFAULT_EXPIRING_DAYS, MAX_EXPIRING_DAYS,
};

use crate::error::{ApiResult, AppError};
use crate::pagination::paginate;
use crate::response::{created, ok};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalQuery {
    pub active: Option<bool>,
    pub parking_space_id: Option<i64>,
    pub household_id: Option<i64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<i64>,
}

pub async fn list_rentals(
    State(state): State<AppState>,
    query: Result<Query<RentalQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let filter = RentalFilter {
        active: query.active,
        parking_space_id: query.parking_space_id,
        household_id: query.household_id,
    };
    info!("Listing rentals with filter: {:?}", filter);

    let rentals = state.store.list_rentals(&filter).await?;
    Ok(ok(paginate(rentals, query.page, query.limit)))
}

pub async fn list_active_rentals(State(state): State<AppState>) -> ApiResult<Response> {
    info!("Listing active rentals");

    let filter = RentalFilter {
        active: Some(true),
        ..Default::default()
    };
    let rentals = state.store.list_rentals(&filter).await?;
    Ok(ok(rentals))
}

/// Active rentals ending within the next `days` days (default 7)
pub async fn list_expiring_rentals(
    State(state): State<AppState>,
    query: Result<Query<ExpiringQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let days = query.days.unwrap_or(DEFAULT_EXPIRING_DAYS);
    if !(0..=MAX_EXPIRING_DAYS).contains(&days) {
        return Err(AppError::invalid(
            "days",
            format!("must be between 0 and {}", MAX_EXPIRING_DAYS),
        ));
    }

    let today = Local::now().date_naive();
    info!("Listing rentals expiring within {} days of {}", days, today);

    let rentals = state.store.get_expiring_rentals(today, days).await?;
    Ok(ok(rentals))
}

pub async fn get_rental(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    info!("Getting rental: {}", id);

    match state.store.get_rental(id).await? {
        Some(rental) => Ok(ok(rental)),
        None => Err(AppError::not_found("Rental")),
    }
}

pub async fn create_rental(
    State(state): State<AppState>,
    payload: Result<Json<RentalCreateInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(input) = payload?;
    info!(
        "Creating rental of parking space {} for household {}",
        input.parking_space_id, input.household_id
    );

    AppError::check(validate_rental_create(&input))?;
    let rental = state.store.create_rental(input).await?;
    Ok(created(rental))
}

pub async fn update_rental(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<RentalUpdateInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    let Json(input) = payload?;
    info!("Updating rental: {}", id);

    AppError::check(validate_rental_update(&input))?;
    match state.store.update_rental(id, input).await? {
        Some(rental) => Ok(ok(rental)),
        None => Err(AppError::not_found("Rental")),
    }
}

/// End a rental and free its parking space
pub async fn end_rental(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    info!("Ending rental: {}", id);

    match state.store.end_rental(id).await? {
        Some(rental) => Ok(ok(rental)),
        None => Err(AppError::not_found("Rental")),
    }
}
