// ABOUTME: In-process entity store backed by ordered maps
// ABOUTME: One write lock covers each mutation together with its coupled writes and log entry

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use parkshare_core::{
    ActivityLog, DashboardStats, Household, HouseholdCreateInput, HouseholdFilter,
    HouseholdUpdateInput, ParkingOffer, ParkingOfferCreateInput, ParkingSpace,
    ParkingSpaceCreateInput, ParkingSpaceFilter, ParkingSpaceUpdateInput, Rental,
    RentalCreateInput, RentalDetails, RentalFilter, RentalRequest, RentalRequestCreateInput,
    RentalRequestFilter, RentalUpdateInput, RequestStatus, SpaceStatus,
};

use crate::rules::{self, NewActivity};
use crate::{ParkingStore, StorageBackend, StorageError, StorageResult};

/// Per-entity id counters; ids start at 1 and never repeat
#[derive(Debug, Default)]
struct IdCounters {
    parking_space: i64,
    household: i64,
    rental: i64,
    activity_log: i64,
    rental_request: i64,
    parking_offer: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default)]
struct MemoryState {
    parking_spaces: BTreeMap<i64, ParkingSpace>,
    households: BTreeMap<i64, Household>,
    rentals: BTreeMap<i64, Rental>,
    activity_logs: Vec<ActivityLog>,
    rental_requests: BTreeMap<i64, RentalRequest>,
    parking_offers: BTreeMap<i64, ParkingOffer>,
    ids: IdCounters,
}

impl MemoryState {
    fn log(&mut self, entry: NewActivity) {
        let id = next_id(&mut self.ids.activity_log);
        debug!("Activity {} ({}): {}", id, entry.activity_type, entry.description);
        self.activity_logs.push(ActivityLog {
            id,
            activity_type: entry.activity_type,
            description: entry.description,
            timestamp: Utc::now(),
            related_id: entry.related_id,
        });
    }

    fn space_number_taken(&self, space_number: &str, except: Option<i64>) -> bool {
        self.parking_spaces
            .values()
            .any(|s| s.space_number == space_number && Some(s.id) != except)
    }

    fn household_number_taken(&self, household_number: &str, except: Option<i64>) -> bool {
        self.households
            .values()
            .any(|h| h.household_number == household_number && Some(h.id) != except)
    }

    fn space_has_active_rental(&self, space_id: i64) -> bool {
        self.rentals
            .values()
            .any(|r| r.parking_space_id == space_id && r.is_active)
    }

    fn household_has_active_rental(&self, household_id: i64) -> bool {
        self.rentals
            .values()
            .any(|r| r.household_id == household_id && r.is_active)
    }

    fn details(&self, rental: &Rental) -> RentalDetails {
        RentalDetails {
            rental: rental.clone(),
            space_number: self
                .parking_spaces
                .get(&rental.parking_space_id)
                .map(|s| s.space_number.clone()),
            household_number: self
                .households
                .get(&rental.household_id)
                .map(|h| h.household_number.clone()),
        }
    }
}

/// Map-backed store. Not crash safe: everything lives in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ParkingStore for MemoryStore {
    async fn initialize(&self) -> StorageResult<()> {
        info!("Using in-memory storage; data is lost on restart");
        Ok(())
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Memory
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn list_parking_spaces(
        &self,
        filter: &ParkingSpaceFilter,
    ) -> StorageResult<Vec<ParkingSpace>> {
        let state = self.state.read().await;
        Ok(state
            .parking_spaces
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    async fn get_parking_space(&self, id: i64) -> StorageResult<Option<ParkingSpace>> {
        Ok(self.state.read().await.parking_spaces.get(&id).cloned())
    }

    async fn get_parking_space_by_number(
        &self,
        space_number: &str,
    ) -> StorageResult<Option<ParkingSpace>> {
        let state = self.state.read().await;
        Ok(state
            .parking_spaces
            .values()
            .find(|s| s.space_number == space_number)
            .cloned())
    }

    async fn create_parking_space(
        &self,
        input: ParkingSpaceCreateInput,
    ) -> StorageResult<ParkingSpace> {
        let status = input.status.unwrap_or_default();
        rules::ensure_initial_space_status(status)?;

        let mut state = self.state.write().await;
        let space_number = input.space_number.trim().to_string();
        if state.space_number_taken(&space_number, None) {
            return Err(StorageError::DuplicateSpaceNumber(space_number));
        }

        let space = ParkingSpace {
            id: next_id(&mut state.ids.parking_space),
            space_number,
            area: input.area,
            status,
            notes: input.notes,
        };
        debug!("Created parking space {} with ID {}", space.space_number, space.id);
        state.parking_spaces.insert(space.id, space.clone());
        state.log(NewActivity::space_created(&space));
        Ok(space)
    }

    async fn update_parking_space(
        &self,
        id: i64,
        input: ParkingSpaceUpdateInput,
    ) -> StorageResult<Option<ParkingSpace>> {
        let mut state = self.state.write().await;
        let Some(existing) = state.parking_spaces.get(&id).cloned() else {
            return Ok(None);
        };

        let updated = rules::merge_space(&existing, input);
        if updated.space_number != existing.space_number
            && state.space_number_taken(&updated.space_number, Some(id))
        {
            return Err(StorageError::DuplicateSpaceNumber(updated.space_number));
        }
        rules::ensure_status_override(
            &existing,
            updated.status,
            state.space_has_active_rental(id),
        )?;

        state.parking_spaces.insert(id, updated.clone());
        state.log(NewActivity::space_updated(&existing, &updated));
        Ok(Some(updated))
    }

    async fn delete_parking_space(&self, id: i64) -> StorageResult<bool> {
        let mut state = self.state.write().await;
        let Some(space) = state.parking_spaces.get(&id).cloned() else {
            return Ok(false);
        };
        if state.space_has_active_rental(id) {
            return Err(rules::space_in_use(&space.space_number));
        }

        state.parking_spaces.remove(&id);
        state.log(NewActivity::space_deleted(&space));
        Ok(true)
    }

    async fn list_households(&self, filter: &HouseholdFilter) -> StorageResult<Vec<Household>> {
        let state = self.state.read().await;
        Ok(state
            .households
            .values()
            .filter(|h| filter.matches(h))
            .cloned()
            .collect())
    }

    async fn get_household(&self, id: i64) -> StorageResult<Option<Household>> {
        Ok(self.state.read().await.households.get(&id).cloned())
    }

    async fn get_household_by_number(
        &self,
        household_number: &str,
    ) -> StorageResult<Option<Household>> {
        let state = self.state.read().await;
        Ok(state
            .households
            .values()
            .find(|h| h.household_number == household_number)
            .cloned())
    }

    async fn create_household(&self, input: HouseholdCreateInput) -> StorageResult<Household> {
        let mut state = self.state.write().await;
        let household_number = input.household_number.trim().to_string();
        if state.household_number_taken(&household_number, None) {
            return Err(StorageError::DuplicateHouseholdNumber(household_number));
        }

        let household = Household {
            id: next_id(&mut state.ids.household),
            household_number,
            contact_name: input.contact_name,
            contact_phone: input.contact_phone,
            notes: input.notes,
        };
        state.households.insert(household.id, household.clone());
        state.log(NewActivity::household_created(&household));
        Ok(household)
    }

    async fn update_household(
        &self,
        id: i64,
        input: HouseholdUpdateInput,
    ) -> StorageResult<Option<Household>> {
        let mut state = self.state.write().await;
        let Some(existing) = state.households.get(&id).cloned() else {
            return Ok(None);
        };

        let updated = rules::merge_household(&existing, input);
        if updated.household_number != existing.household_number
            && state.household_number_taken(&updated.household_number, Some(id))
        {
            return Err(StorageError::DuplicateHouseholdNumber(
                updated.household_number,
            ));
        }

        state.households.insert(id, updated.clone());
        state.log(NewActivity::household_updated(&updated));
        Ok(Some(updated))
    }

    async fn delete_household(&self, id: i64) -> StorageResult<bool> {
        let mut state = self.state.write().await;
        let Some(household) = state.households.get(&id).cloned() else {
            return Ok(false);
        };
        if state.household_has_active_rental(id) {
            return Err(rules::household_in_use(&household.household_number));
        }

        state.households.remove(&id);
        state.log(NewActivity::household_deleted(&household));
        Ok(true)
    }

    async fn list_rentals(&self, filter: &RentalFilter) -> StorageResult<Vec<RentalDetails>> {
        let state = self.state.read().await;
        Ok(state
            .rentals
            .values()
            .filter(|r| filter.matches(r))
            .map(|r| state.details(r))
            .collect())
    }

    async fn get_rental(&self, id: i64) -> StorageResult<Option<Rental>> {
        Ok(self.state.read().await.rentals.get(&id).cloned())
    }

    async fn get_expiring_rentals(
        &self,
        today: NaiveDate,
        days: i64,
    ) -> StorageResult<Vec<RentalDetails>> {
        let horizon = today + Duration::days(days);
        let state = self.state.read().await;
        let mut expiring: Vec<RentalDetails> = state
            .rentals
            .values()
            .filter(|r| r.is_active && r.end_date >= today && r.end_date <= horizon)
            .map(|r| state.details(r))
            .collect();
        expiring.sort_by_key(|d| (d.rental.end_date, d.rental.id));
        Ok(expiring)
    }

    async fn create_rental(&self, input: RentalCreateInput) -> StorageResult<Rental> {
        let mut state = self.state.write().await;

        let space = state
            .parking_spaces
            .get(&input.parking_space_id)
            .cloned()
            .ok_or_else(rules::space_not_found)?;
        let household = state
            .households
            .get(&input.household_id)
            .cloned()
            .ok_or_else(rules::household_not_found)?;
        rules::ensure_space_rentable(&space)?;
        if state.space_has_active_rental(space.id) {
            return Err(rules::space_not_available(&space.space_number));
        }

        let rental = Rental {
            id: next_id(&mut state.ids.rental),
            parking_space_id: space.id,
            household_id: household.id,
            license_plate: input.license_plate.trim().to_string(),
            start_date: input.start_date,
            end_date: input.end_date,
            is_active: true,
            notes: input.notes,
            created_at: Utc::now(),
        };
        state.rentals.insert(rental.id, rental.clone());
        if let Some(s) = state.parking_spaces.get_mut(&space.id) {
            s.status = SpaceStatus::Occupied;
        }
        state.log(NewActivity::rental_created(&rental, &space, &household));
        info!("Rental {} created for space {}", rental.id, space.space_number);
        Ok(rental)
    }

    async fn update_rental(
        &self,
        id: i64,
        input: RentalUpdateInput,
    ) -> StorageResult<Option<Rental>> {
        let mut state = self.state.write().await;
        let Some(existing) = state.rentals.get(&id).cloned() else {
            return Ok(None);
        };

        let updated = rules::merge_rental(&existing, input)?;
        state.rentals.insert(id, updated.clone());
        state.log(NewActivity::rental_updated(&updated));
        Ok(Some(updated))
    }

    async fn end_rental(&self, id: i64) -> StorageResult<Option<Rental>> {
        let mut state = self.state.write().await;
        let Some(mut rental) = state.rentals.get(&id).cloned() else {
            return Ok(None);
        };
        rules::ensure_rental_active(&rental)?;

        rental.is_active = false;
        state.rentals.insert(id, rental.clone());

        let mut space_number = String::new();
        if let Some(space) = state.parking_spaces.get_mut(&rental.parking_space_id) {
            space.status = SpaceStatus::Available;
            space_number = space.space_number.clone();
        }
        state.log(NewActivity::rental_ended(&rental, &space_number));
        info!("Rental {} ended", id);
        Ok(Some(rental))
    }

    async fn list_activity_logs(&self, limit: usize) -> StorageResult<Vec<ActivityLog>> {
        let state = self.state.read().await;
        Ok(state
            .activity_logs
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_dashboard_stats(&self) -> StorageResult<DashboardStats> {
        let state = self.state.read().await;
        let active = state.rentals.values().filter(|r| r.is_active).count() as i64;
        Ok(DashboardStats::from_spaces(
            state.parking_spaces.values(),
            active,
        ))
    }

    async fn list_rental_requests(
        &self,
        filter: &RentalRequestFilter,
    ) -> StorageResult<Vec<RentalRequest>> {
        let state = self.state.read().await;
        Ok(state
            .rental_requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn get_rental_request(&self, id: i64) -> StorageResult<Option<RentalRequest>> {
        Ok(self.state.read().await.rental_requests.get(&id).cloned())
    }

    async fn create_rental_request(
        &self,
        input: RentalRequestCreateInput,
    ) -> StorageResult<RentalRequest> {
        let mut state = self.state.write().await;
        let request = RentalRequest {
            id: next_id(&mut state.ids.rental_request),
            name: input.name,
            contact: input.contact,
            license_plate: input.license_plate.trim().to_string(),
            start_date: input.start_date,
            end_date: input.end_date,
            notes: input.notes,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        };
        state.rental_requests.insert(request.id, request.clone());
        state.log(NewActivity::request_created(&request));
        Ok(request)
    }

    async fn update_rental_request_status(
        &self,
        id: i64,
        status: RequestStatus,
    ) -> StorageResult<Option<RentalRequest>> {
        let mut state = self.state.write().await;
        let Some(request) = state.rental_requests.get_mut(&id) else {
            return Ok(None);
        };
        let previous = request.status;
        request.status = status;
        let request = request.clone();
        state.log(NewActivity::request_status_updated(&request, previous));
        Ok(Some(request))
    }

    async fn list_parking_offers(&self, request_id: i64) -> StorageResult<Vec<ParkingOffer>> {
        let state = self.state.read().await;
        Ok(state
            .parking_offers
            .values()
            .filter(|o| o.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn create_parking_offer(
        &self,
        request_id: i64,
        input: ParkingOfferCreateInput,
    ) -> StorageResult<ParkingOffer> {
        let mut state = self.state.write().await;
        let Some(request) = state.rental_requests.get(&request_id).cloned() else {
            return Err(StorageError::NotFound("Parking request".to_string()));
        };
        rules::ensure_request_accepts_offers(&request)?;

        let offer = ParkingOffer {
            id: next_id(&mut state.ids.parking_offer),
            request_id,
            space_number: input.space_number.trim().to_string(),
            owner_name: input.owner_name,
            owner_contact: input.owner_contact,
            notes: input.notes,
            created_at: Utc::now(),
        };
        state.parking_offers.insert(offer.id, offer.clone());

        let mut matched = request;
        matched.status = RequestStatus::Matched;
        state.rental_requests.insert(request_id, matched.clone());
        state.log(NewActivity::offer_created(&offer, &matched));
        info!("Parking request {} matched by offer {}", request_id, offer.id);
        Ok(offer)
    }
}
