// ABOUTME: HTTP request handlers for household operations
// ABOUTME: CRUD, search and the per-household rental history

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::Response,
    Json,
};
use serde::Deserialize;
use tracing::info;

use parkshare_core::{
    validate_household_create, validate_household_update, HouseholdCreateInput, HouseholdFilter,
    HouseholdUpdateInput, RentalFilter,
};

use crate::error::{ApiResult, AppError};
use crate::pagination::paginate;
use crate::response::{created, no_content, ok};
use crate::{non_empty, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct HouseholdQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn list_households(
    State(state): State<AppState>,
    query: Result<Query<HouseholdQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    info!("Listing households");

    let filter = HouseholdFilter {
        search: non_empty(query.search),
    };
    let households = state.store.list_households(&filter).await?;
    Ok(ok(paginate(households, query.page, query.limit)))
}

pub async fn get_household(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    info!("Getting household: {}", id);

    match state.store.get_household(id).await? {
        Some(household) => Ok(ok(household)),
        None => Err(AppError::not_found("Household")),
    }
}

pub async fn create_household(
    State(state): State<AppState>,
    payload: Result<Json<HouseholdCreateInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(input) = payload?;
    info!("Creating household '{}'", input.household_number);

    AppError::check(validate_household_create(&input))?;
    let household = state.store.create_household(input).await?;
    Ok(created(household))
}

pub async fn update_household(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<HouseholdUpdateInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    let Json(input) = payload?;
    info!("Updating household: {}", id);

    AppError::check(validate_household_update(&input))?;
    match state.store.update_household(id, input).await? {
        Some(household) => Ok(ok(household)),
        None => Err(AppError::not_found("Household")),
    }
}

pub async fn delete_household(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    info!("Deleting household: {}", id);

    if state.store.delete_household(id).await? {
        Ok(no_content())
    } else {
        Err(AppError::not_found("Household"))
    }
}

/// Rentals held by one household, active ones first
pub async fn list_household_rentals(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    info!("Listing rentals for household: {}", id);

    if state.store.get_household(id).await?.is_none() {
        return Err(AppError::not_found("Household"));
    }

    let filter = RentalFilter {
        household_id: Some(id),
        ..Default::default()
    };
    let mut rentals = state.store.list_rentals(&filter).await?;
    rentals.sort_by_key(|details| !details.rental.is_active);
    Ok(ok(rentals))
}
