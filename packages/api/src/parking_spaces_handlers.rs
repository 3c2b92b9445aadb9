// ABOUTME: HTTP request handlers for parking space operations
// ABOUTME: CRUD plus filtered listing and the available-spaces shortcut

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
    validate_parking_space_create, validate_parking_space_update, ParkingSpaceCreateInput,
    ParkingSpaceFilter, ParkingSpaceUpdateInput, SpaceStatus,
};

use crate::error::{ApiResult, AppError};
use crate::pagination::paginate;
use crate::response::{created, no_content, ok};
use crate::{non_empty, AppState};

/// Query string accepted by the parking space list
#[derive(Debug, Default, Deserialize)]
pub struct ParkingSpaceQuery {
    pub status: Option<String>,
    pub area: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ParkingSpaceQuery {
    fn filter(&self) -> ApiResult<ParkingSpaceFilter> {
        let status = non_empty(self.status.clone())
            .map(|s| s.parse::<SpaceStatus>())
            .transpose()
            .map_err(|e| AppError::invalid("status", e.to_string()))?;
        Ok(ParkingSpaceFilter {
            status,
            area: non_empty(self.area.clone()),
            search: non_empty(self.search.clone()),
        })
    }
}

/// List parking spaces, optionally filtered and paginated
pub async fn list_parking_spaces(
    State(state): State<AppState>,
    query: Result<Query<ParkingSpaceQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let filter = query.filter()?;
    info!("Listing parking spaces with filter: {:?}", filter);

    let spaces = state.store.list_parking_spaces(&filter).await?;
    Ok(ok(paginate(spaces, query.page, query.limit)))
}

/// Spaces that can be rented right now
pub async fn list_available_parking_spaces(State(state): State<AppState>) -> ApiResult<Response> {
    info!("Listing available parking spaces");

    let filter = ParkingSpaceFilter {
        status: Some(SpaceStatus::Available),
        ..Default::default()
    };
    let spaces = state.store.list_parking_spaces(&filter).await?;
    Ok(ok(spaces))
}

pub async fn get_parking_space(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    info!("Getting parking space: {}", id);

    match state.store.get_parking_space(id).await? {
        Some(space) => Ok(ok(space)),
        None => Err(AppError::not_found("Parking space")),
    }
}

pub async fn create_parking_space(
    State(state): State<AppState>,
    payload: Result<Json<ParkingSpaceCreateInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(input) = payload?;
    info!("Creating parking space '{}'", input.space_number);

    AppError::check(validate_parking_space_create(&input))?;
    let space = state.store.create_parking_space(input).await?;

    info!("Created parking space {} with ID {}", space.space_number, space.id);
    Ok(created(space))
}

pub async fn update_parking_space(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ParkingSpaceUpdateInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    let Json(input) = payload?;
    info!("Updating parking space: {}", id);

    AppError::check(validate_parking_space_update(&input))?;
    match state.store.update_parking_space(id, input).await? {
        Some(space) => Ok(ok(space)),
        None => Err(AppError::not_found("Parking space")),
    }
}

pub async fn delete_parking_space(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    info!("Deleting parking space: {}", id);

    if state.store.delete_parking_space(id).await? {
        Ok(no_content())
    } else {
        Err(AppError::not_found("Parking space"))
    }
}
