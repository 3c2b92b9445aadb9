// ABOUTME: Entity store abstraction with in-memory and SQLite backends
// ABOUTME: Rental lifecycle rules run inside the store so coupled writes stay atomic

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use parkshare_core::{
    ActivityLog, DashboardStats, Household, HouseholdCreateInput, HouseholdFilter,
    HouseholdUpdateInput, ParkingOffer, ParkingOfferCreateInput, ParkingSpace,
    ParkingSpaceCreateInput, ParkingSpaceFilter, ParkingSpaceUpdateInput, Rental,
    RentalCreateInput, RentalDetails, RentalFilter, RentalRequest, RentalRequestCreateInput,
    RentalRequestFilter, RentalUpdateInput, RequestStatus,
};

pub mod factory;
pub mod memory;
pub mod rules;
pub mod sqlite;

pub use factory::{ParkingStoreExt, StorageFactory};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    /// Input refers to something that does not exist or is malformed
    #[error("{0}")]
    Validation(String),
    /// A lifecycle precondition did not hold
    #[error("{0}")]
    BusinessRule(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Parking space number already exists: {0}")]
    DuplicateSpaceNumber(String),
    #[error("Household number already exists: {0}")]
    DuplicateHouseholdNumber(String),
    #[error("Invalid storage configuration: {0}")]
    InvalidConfig(String),
}

impl StorageError {
    /// True for errors caused by the caller rather than the backing store
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StorageError::Validation(_)
                | StorageError::BusinessRule(_)
                | StorageError::NotFound(_)
                | StorageError::DuplicateSpaceNumber(_)
                | StorageError::DuplicateHouseholdNumber(_)
        )
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    pub enable_wal: bool,
    pub max_connections: u32,
    pub busy_timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::Memory,
            enable_wal: true,
            max_connections: 5,
            busy_timeout_seconds: 30,
        }
    }
}

impl StorageConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            provider: StorageProvider::Sqlite { path: path.into() },
            ..Self::default()
        }
    }

    /// The SQLite backend is chosen whenever a database path is configured
    pub fn from_database_path(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => Self::sqlite(path),
            None => Self::memory(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageProvider {
    Memory,
    Sqlite { path: PathBuf },
}

/// Which backend a store runs on, reported by the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Sqlite => "sqlite",
        }
    }
}

/// Uniform entity store. Every mutation appends one activity log entry in the
/// same logical operation; lookups report a missing id as `None`.
#[async_trait]
pub trait ParkingStore: Send + Sync {
    async fn initialize(&self) -> StorageResult<()>;
    fn backend(&self) -> StorageBackend;
    /// Round trip to the backing store
    async fn ping(&self) -> StorageResult<()>;

    // Parking spaces
    async fn list_parking_spaces(
        &self,
        filter: &ParkingSpaceFilter,
    ) -> StorageResult<Vec<ParkingSpace>>;
    async fn get_parking_space(&self, id: i64) -> StorageResult<Option<ParkingSpace>>;
    async fn get_parking_space_by_number(
        &self,
        space_number: &str,
    ) -> StorageResult<Option<ParkingSpace>>;
    async fn create_parking_space(
        &self,
        input: ParkingSpaceCreateInput,
    ) -> StorageResult<ParkingSpace>;
    async fn update_parking_space(
        &self,
        id: i64,
        input: ParkingSpaceUpdateInput,
    ) -> StorageResult<Option<ParkingSpace>>;
    /// `Ok(false)` when the id is unknown; refused while a rental is active
    async fn delete_parking_space(&self, id: i64) -> StorageResult<bool>;

    // Households
    async fn list_households(&self, filter: &HouseholdFilter) -> StorageResult<Vec<Household>>;
    async fn get_household(&self, id: i64) -> StorageResult<Option<Household>>;
    async fn get_household_by_number(
        &self,
        household_number: &str,
    ) -> StorageResult<Option<Household>>;
    async fn create_household(&self, input: HouseholdCreateInput) -> StorageResult<Household>;
    async fn update_household(
        &self,
        id: i64,
        input: HouseholdUpdateInput,
    ) -> StorageResult<Option<Household>>;
    /// `Ok(false)` when the id is unknown; refused while a rental is active
    async fn delete_household(&self, id: i64) -> StorageResult<bool>;

    // Rentals
    async fn list_rentals(&self, filter: &RentalFilter) -> StorageResult<Vec<RentalDetails>>;
    async fn get_rental(&self, id: i64) -> StorageResult<Option<Rental>>;
    /// Active rentals ending within `[today, today + days]`, soonest first
    async fn get_expiring_rentals(
        &self,
        today: NaiveDate,
        days: i64,
    ) -> StorageResult<Vec<RentalDetails>>;
    /// Requires an available space; marks it occupied in the same operation
    async fn create_rental(&self, input: RentalCreateInput) -> StorageResult<Rental>;
    async fn update_rental(
        &self,
        id: i64,
        input: RentalUpdateInput,
    ) -> StorageResult<Option<Rental>>;
    /// Deactivates the rental and frees its space
    async fn end_rental(&self, id: i64) -> StorageResult<Option<Rental>>;

    // Activity logs
    /// Newest first
    async fn list_activity_logs(&self, limit: usize) -> StorageResult<Vec<ActivityLog>>;

    // Dashboard
    async fn get_dashboard_stats(&self) -> StorageResult<DashboardStats>;

    // Rental requests
    async fn list_rental_requests(
        &self,
        filter: &RentalRequestFilter,
    ) -> StorageResult<Vec<RentalRequest>>;
    async fn get_rental_request(&self, id: i64) -> StorageResult<Option<RentalRequest>>;
    async fn create_rental_request(
        &self,
        input: RentalRequestCreateInput,
    ) -> StorageResult<RentalRequest>;
    async fn update_rental_request_status(
        &self,
        id: i64,
        status: RequestStatus,
    ) -> StorageResult<Option<RentalRequest>>;

    // Parking offers
    async fn list_parking_offers(&self, request_id: i64) -> StorageResult<Vec<ParkingOffer>>;
    /// Requires a pending request; marks it matched in the same operation
    async fn create_parking_offer(
        &self,
        request_id: i64,
        input: ParkingOfferCreateInput,
    ) -> StorageResult<ParkingOffer>;
}
