// ABOUTME: Core types, validation and constants for Parkshare
// ABOUTME: Foundational package shared by the storage, API and CLI packages

pub mod constants;
pub mod types;
pub mod validation;

// Re-export main types
pub use types::{
    ActivityLog, ActivityType, DashboardStats, Household, HouseholdCreateInput, HouseholdFilter,
    HouseholdUpdateInput, ParkingOffer, ParkingOfferCreateInput, ParkingSpace,
    ParkingSpaceCreateInput, ParkingSpaceFilter, ParkingSpaceUpdateInput, ParseTagError, Rental,
    RentalCreateInput, RentalDetails, RentalFilter, RentalRequest, RentalRequestCreateInput,
    RentalRequestFilter, RentalUpdateInput, RequestStatus, SpaceStatus,
};

// Re-export constants
pub use constants::{
    activity_log_limit, DEFAULT_ACTIVITY_LOG_LIMIT, DEFAULT_EXPIRING_DAYS, MAX_ACTIVITY_LOG_LIMIT,
    MAX_EXPIRING_DAYS,
};

// Re-export validation
pub use validation::{
    describe, validate_date_range, validate_household_create, validate_household_update,
    validate_parking_offer_create, validate_parking_space_create, validate_parking_space_update,
    validate_rental_create, validate_rental_request_create, validate_rental_update,
    ValidationError,
};
