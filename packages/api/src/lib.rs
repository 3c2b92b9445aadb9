// ABOUTME: HTTP API layer for Parkshare providing REST endpoints and routing
// ABOUTME: Handlers validate input shape and delegate to the entity store

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use parkshare_storage::ParkingStore;

pub mod activity_handlers;
pub mod error;
pub mod health_handlers;
pub mod households_handlers;
pub mod pagination;
pub mod parking_spaces_handlers;
pub mod rental_requests_handlers;
pub mod rentals_handlers;
pub mod response;

pub use error::{ApiResult, AppError};
pub use response::ApiResponse;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ParkingStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn ParkingStore>) -> Self {
        Self { store }
    }
}

/// Blank query values behave as if the parameter were absent
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Creates the parking spaces API router
pub fn create_parking_spaces_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(parking_spaces_handlers::list_parking_spaces)
                .post(parking_spaces_handlers::create_parking_space),
        )
        .route(
            "/available",
            get(parking_spaces_handlers::list_available_parking_spaces),
        )
        .route(
            "/{id}",
            get(parking_spaces_handlers::get_parking_space)
                .put(parking_spaces_handlers::update_parking_space)
                .delete(parking_spaces_handlers::delete_parking_space),
        )
}

/// Creates the households API router
pub fn create_households_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(households_handlers::list_households).post(households_handlers::create_household),
        )
        .route(
            "/{id}",
            get(households_handlers::get_household)
                .put(households_handlers::update_household)
                .delete(households_handlers::delete_household),
        )
        .route(
            "/{id}/rentals",
            get(households_handlers::list_household_rentals),
        )
}

/// Creates the rentals API router
pub fn create_rentals_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(rentals_handlers::list_rentals).post(rentals_handlers::create_rental),
        )
        .route("/active", get(rentals_handlers::list_active_rentals))
        .route("/expiring", get(rentals_handlers::list_expiring_rentals))
        .route(
            "/{id}",
            get(rentals_handlers::get_rental).put(rentals_handlers::update_rental),
        )
        .route("/{id}/end", post(rentals_handlers::end_rental))
}

/// Creates the rental requests API router, offers nested per request
pub fn create_rental_requests_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(rental_requests_handlers::list_rental_requests)
                .post(rental_requests_handlers::create_rental_request),
        )
        .route("/{id}", get(rental_requests_handlers::get_rental_request))
        .route(
            "/{id}/status",
            put(rental_requests_handlers::update_rental_request_status),
        )
        .route(
            "/{id}/offers",
            get(rental_requests_handlers::list_parking_offers)
                .post(rental_requests_handlers::create_parking_offer),
        )
}

/// Full `/api` router with state applied
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/parking-spaces", create_parking_spaces_router())
        .nest("/api/households", create_households_router())
        .nest("/api/rentals", create_rentals_router())
        .nest("/api/rental-requests", create_rental_requests_router())
        .route(
            "/api/activity-logs",
            get(activity_handlers::list_activity_logs),
        )
        .route(
            "/api/dashboard/stats",
            get(activity_handlers::get_dashboard_stats),
        )
        .route("/api/health", get(health_handlers::health_check))
        .with_state(state)
}
