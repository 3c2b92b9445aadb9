// ABOUTME: Rental lifecycle preconditions and activity log entries
// ABOUTME: Backend independent; each store calls these inside its own atomic section

use parkshare_core::{
    validate_date_range, ActivityType, Household, HouseholdUpdateInput, ParkingOffer,
    ParkingSpace, ParkingSpaceUpdateInput, Rental, RentalRequest, RentalUpdateInput,
    RequestStatus, SpaceStatus,
};
use tracing::warn;

use crate::{StorageError, StorageResult};

/// An activity log row waiting to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub activity_type: ActivityType,
    pub description: String,
    pub related_id: Option<i64>,
}

impl NewActivity {
    fn new(activity_type: ActivityType, description: String, related_id: i64) -> Self {
        Self {
            activity_type,
            description,
            related_id: Some(related_id),
        }
    }

    pub fn space_created(space: &ParkingSpace) -> Self {
        Self::new(
            ActivityType::SpaceCreated,
            format!(
                "Parking space {} created in area {}",
                space.space_number, space.area
            ),
            space.id,
        )
    }

    pub fn space_updated(before: &ParkingSpace, after: &ParkingSpace) -> Self {
        let description = if before.status != after.status {
            format!(
                "Parking space {} updated (status {} -> {})",
                after.space_number, before.status, after.status
            )
        } else {
            format!("Parking space {} updated", after.space_number)
        };
        Self::new(ActivityType::SpaceUpdated, description, after.id)
    }

    pub fn space_deleted(space: &ParkingSpace) -> Self {
        Self::new(
            ActivityType::SpaceDeleted,
            format!("Parking space {} deleted", space.space_number),
            space.id,
        )
    }

    pub fn household_created(household: &Household) -> Self {
        Self::new(
            ActivityType::HouseholdCreated,
            format!("Household {} registered", household.household_number),
            household.id,
        )
    }

    pub fn household_updated(household: &Household) -> Self {
        Self::new(
            ActivityType::HouseholdUpdated,
            format!("Household {} updated", household.household_number),
            household.id,
        )
    }

    pub fn household_deleted(household: &Household) -> Self {
        Self::new(
            ActivityType::HouseholdDeleted,
            format!("Household {} deleted", household.household_number),
            household.id,
        )
    }

    pub fn rental_created(rental: &Rental, space: &ParkingSpace, household: &Household) -> Self {
        Self::new(
            ActivityType::RentalCreated,
            format!(
                "Parking space {} rented to household {} ({}) from {} to {}",
                space.space_number,
                household.household_number,
                rental.license_plate,
                rental.start_date,
                rental.end_date
            ),
            rental.id,
        )
    }

    pub fn rental_updated(rental: &Rental) -> Self {
        Self::new(
            ActivityType::RentalUpdated,
            format!("Rental {} updated ({})", rental.id, rental.license_plate),
            rental.id,
        )
    }

    pub fn rental_ended(rental: &Rental, space_number: &str) -> Self {
        Self::new(
            ActivityType::RentalEnded,
            format!(
                "Rental {} ended; parking space {} is available again",
                rental.id, space_number
            ),
            rental.id,
        )
    }

    pub fn request_created(request: &RentalRequest) -> Self {
        Self::new(
            ActivityType::RequestCreated,
            format!(
                "Parking request from {} for {} ({} to {})",
                request.name, request.license_plate, request.start_date, request.end_date
            ),
            request.id,
        )
    }

    pub fn request_status_updated(request: &RentalRequest, previous: RequestStatus) -> Self {
        Self::new(
            ActivityType::RequestStatusUpdated,
            format!(
                "Parking request {} status {} -> {}",
                request.id, previous, request.status
            ),
            request.id,
        )
    }

    pub fn offer_created(offer: &ParkingOffer, request: &RentalRequest) -> Self {
        Self::new(
            ActivityType::OfferCreated,
            format!(
                "{} offered parking space {} for request {} ({})",
                offer.owner_name, offer.space_number, request.id, request.name
            ),
            offer.id,
        )
    }
}

/// New spaces start available or in maintenance; occupancy comes from rentals
pub fn ensure_initial_space_status(status: SpaceStatus) -> StorageResult<()> {
    if status == SpaceStatus::Occupied {
        return Err(StorageError::BusinessRule(
            "A new parking space cannot start out OCCUPIED; create a rental instead".to_string(),
        ));
    }
    Ok(())
}

/// Direct status edits may not break the occupied-iff-rented invariant
pub fn ensure_status_override(
    space: &ParkingSpace,
    requested: SpaceStatus,
    has_active_rental: bool,
) -> StorageResult<()> {
    if requested == space.status {
        return Ok(());
    }
    if requested == SpaceStatus::Occupied {
        warn!(space = %space.space_number, "Rejected manual OCCUPIED status");
        return Err(StorageError::BusinessRule(format!(
            "Parking space {} can only become OCCUPIED through a rental",
            space.space_number
        )));
    }
    if has_active_rental {
        warn!(space = %space.space_number, requested = %requested, "Rejected status change on rented space");
        return Err(StorageError::BusinessRule(format!(
            "Parking space {} has an active rental; end it before changing status",
            space.space_number
        )));
    }
    Ok(())
}

pub fn ensure_space_rentable(space: &ParkingSpace) -> StorageResult<()> {
    if space.status != SpaceStatus::Available {
        warn!(space = %space.space_number, status = %space.status, "Space not available for rental");
        return Err(space_not_available(&space.space_number));
    }
    Ok(())
}

pub fn space_not_available(space_number: &str) -> StorageError {
    StorageError::BusinessRule(format!("Parking space {} is not available", space_number))
}

pub fn ensure_rental_active(rental: &Rental) -> StorageResult<()> {
    if !rental.is_active {
        return Err(rental_already_ended(rental.id));
    }
    Ok(())
}

pub fn rental_already_ended(id: i64) -> StorageError {
    StorageError::BusinessRule(format!("Rental {} has already ended", id))
}

pub fn ensure_request_accepts_offers(request: &RentalRequest) -> StorageResult<()> {
    if !request.status.accepts_offers() {
        warn!(request_id = request.id, status = %request.status, "Offer rejected");
        return Err(request_closed(request.id));
    }
    Ok(())
}

pub fn request_closed(id: i64) -> StorageError {
    StorageError::BusinessRule(format!(
        "Parking request {} is no longer accepting offers",
        id
    ))
}

pub fn space_in_use(space_number: &str) -> StorageError {
    StorageError::BusinessRule(format!(
        "Parking space {} has an active rental and cannot be deleted",
        space_number
    ))
}

pub fn household_in_use(household_number: &str) -> StorageError {
    StorageError::BusinessRule(format!(
        "Household {} has an active rental and cannot be deleted",
        household_number
    ))
}

pub fn space_not_found() -> StorageError {
    StorageError::Validation("Parking space not found".to_string())
}

pub fn household_not_found() -> StorageError {
    StorageError::Validation("Household not found".to_string())
}

/// Apply a partial update, leaving absent fields untouched
/// `None` keeps the stored value; a blank string clears it
fn merge_optional(update: Option<String>, current: &Option<String>) -> Option<String> {
    match update {
        Some(value) if value.trim().is_empty() => None,
        Some(value) => Some(value),
        None => current.clone(),
    }
}

pub fn merge_space(space: &ParkingSpace, input: ParkingSpaceUpdateInput) -> ParkingSpace {
    ParkingSpace {
        id: space.id,
        space_number: input
            .space_number
            .map(|n| n.trim().to_string())
            .unwrap_or_else(|| space.space_number.clone()),
        area: input.area.unwrap_or_else(|| space.area.clone()),
        status: input.status.unwrap_or(space.status),
        notes: merge_optional(input.notes, &space.notes),
    }
}

pub fn merge_household(household: &Household, input: HouseholdUpdateInput) -> Household {
    Household {
        id: household.id,
        household_number: input
            .household_number
            .map(|n| n.trim().to_string())
            .unwrap_or_else(|| household.household_number.clone()),
        contact_name: merge_optional(input.contact_name, &household.contact_name),
        contact_phone: merge_optional(input.contact_phone, &household.contact_phone),
        notes: merge_optional(input.notes, &household.notes),
    }
}

/// Merge an update and re-check the date range against the merged record
pub fn merge_rental(rental: &Rental, input: RentalUpdateInput) -> StorageResult<Rental> {
    let merged = Rental {
        license_plate: input
            .license_plate
            .unwrap_or_else(|| rental.license_plate.clone()),
        start_date: input.start_date.unwrap_or(rental.start_date),
        end_date: input.end_date.unwrap_or(rental.end_date),
        notes: merge_optional(input.notes, &rental.notes),
        ..rental.clone()
    };
    if let Some(error) = validate_date_range(merged.start_date, merged.end_date) {
        return Err(StorageError::Validation(error.to_string()));
    }
    Ok(merged)
}
