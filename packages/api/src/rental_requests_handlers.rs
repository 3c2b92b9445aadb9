// ABOUTME: HTTP request handlers for ad-hoc rental requests and parking offers
// ABOUTME: The first offer on a pending request marks it matched

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
    validate_parking_offer_create, validate_rental_request_create, ParkingOfferCreateInput,
    RentalRequestCreateInput, RentalRequestFilter, RequestStatus,
};

use crate::error::{ApiResult, AppError};
use crate::pagination::paginate;
use crate::response::{created, ok};
use crate::{non_empty, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct RentalRequestQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Request body for a manual status change
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

fn parse_status(value: &str) -> ApiResult<RequestStatus> {
    value
        .parse()
        .map_err(|e: parkshare_core::ParseTagError| AppError::invalid("status", e.to_string()))
}

pub async fn list_rental_requests(
    State(state): State<AppState>,
    query: Result<Query<RentalRequestQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let status = non_empty(query.status)
        .map(|s| parse_status(&s))
        .transpose()?;
    info!("Listing rental requests (status: {:?})", status);

    let requests = state
        .store
        .list_rental_requests(&RentalRequestFilter { status })
        .await?;
    Ok(ok(paginate(requests, query.page, query.limit)))
}

pub async fn get_rental_request(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    info!("Getting rental request: {}", id);

    match state.store.get_rental_request(id).await? {
        Some(request) => Ok(ok(request)),
        None => Err(AppError::not_found("Parking request")),
    }
}

/// Anyone may post a request; it always starts out pending
pub async fn create_rental_request(
    State(state): State<AppState>,
    payload: Result<Json<RentalRequestCreateInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(input) = payload?;
    info!("Creating rental request for {}", input.license_plate);

    AppError::check(validate_rental_request_create(&input))?;
    let request = state.store.create_rental_request(input).await?;
    Ok(created(request))
}

pub async fn update_rental_request_status(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Path(id) = path?;
    let Json(body) = payload?;
    let status = parse_status(&body.status)?;
    info!("Setting rental request {} status to {}", id, status);

    match state.store.update_rental_request_status(id, status).await? {
        Some(request) => Ok(ok(request)),
        None => Err(AppError::not_found("Parking request")),
    }
}

pub async fn list_parking_offers(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Response> {
    let Path(request_id) = path?;
    info!("Listing offers for rental request: {}", request_id);

    if state.store.get_rental_request(request_id).await?.is_none() {
        return Err(AppError::not_found("Parking request"));
    }
    let offers = state.store.list_parking_offers(request_id).await?;
    Ok(ok(offers))
}

pub async fn create_parking_offer(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ParkingOfferCreateInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Path(request_id) = path?;
    let Json(input) = payload?;
    info!(
        "Offering parking space {} for rental request {}",
        input.space_number, request_id
    );

    AppError::check(validate_parking_offer_create(&input))?;
    let offer = state.store.create_parking_offer(request_id, input).await?;
    Ok(created(offer))
}
