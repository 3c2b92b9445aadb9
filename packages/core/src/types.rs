// ABOUTME: Entity and input type definitions for parking coordination
// ABOUTME: Spaces, households, rentals, activity logs, rental requests and parking offers

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a status or activity tag string is not recognised
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown {kind}: {value}")]
pub struct ParseTagError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseTagError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Occupancy status of a parking space
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpaceStatus {
    Available,
    Occupied,
    Maintenance,
}

impl Default for SpaceStatus {
    fn default() -> Self {
        SpaceStatus::Available
    }
}

impl SpaceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpaceStatus::Available => "AVAILABLE",
            SpaceStatus::Occupied => "OCCUPIED",
            SpaceStatus::Maintenance => "MAINTENANCE",
        }
    }
}

impl fmt::Display for SpaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpaceStatus {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AVAILABLE" => Ok(SpaceStatus::Available),
            "OCCUPIED" => Ok(SpaceStatus::Occupied),
            "MAINTENANCE" => Ok(SpaceStatus::Maintenance),
            _ => Err(ParseTagError::new("space status", s)),
        }
    }
}

/// Lifecycle status of an ad-hoc rental request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Matched,
    Expired,
    Cancelled,
}

impl Default for RequestStatus {
    fn default() -> Self {
        RequestStatus::Pending
    }
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Matched => "MATCHED",
            RequestStatus::Expired => "EXPIRED",
            RequestStatus::Cancelled => "CANCELLED",
        }
    }

    /// Only pending requests take new offers
    pub fn accepts_offers(&self) -> bool {
        matches!(self, RequestStatus::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(RequestStatus::Pending),
            "MATCHED" => Ok(RequestStatus::Matched),
            "EXPIRED" => Ok(RequestStatus::Expired),
            "CANCELLED" => Ok(RequestStatus::Cancelled),
            _ => Err(ParseTagError::new("request status", s)),
        }
    }
}

/// Tag recorded on every activity log entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    SpaceCreated,
    SpaceUpdated,
    SpaceDeleted,
    HouseholdCreated,
    HouseholdUpdated,
    HouseholdDeleted,
    RentalCreated,
    RentalUpdated,
    RentalEnded,
    RequestCreated,
    RequestStatusUpdated,
    OfferCreated,
}

impl ActivityType {
    pub const ALL: [ActivityType; 12] = [
        ActivityType::SpaceCreated,
        ActivityType::SpaceUpdated,
        ActivityType::SpaceDeleted,
        ActivityType::HouseholdCreated,
        ActivityType::HouseholdUpdated,
        ActivityType::HouseholdDeleted,
        ActivityType::RentalCreated,
        ActivityType::RentalUpdated,
        ActivityType::RentalEnded,
        ActivityType::RequestCreated,
        ActivityType::RequestStatusUpdated,
        ActivityType::OfferCreated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::SpaceCreated => "SPACE_CREATED",
            ActivityType::SpaceUpdated => "SPACE_UPDATED",
            ActivityType::SpaceDeleted => "SPACE_DELETED",
            ActivityType::HouseholdCreated => "HOUSEHOLD_CREATED",
            ActivityType::HouseholdUpdated => "HOUSEHOLD_UPDATED",
            ActivityType::HouseholdDeleted => "HOUSEHOLD_DELETED",
            ActivityType::RentalCreated => "RENTAL_CREATED",
            ActivityType::RentalUpdated => "RENTAL_UPDATED",
            ActivityType::RentalEnded => "RENTAL_ENDED",
            ActivityType::RequestCreated => "REQUEST_CREATED",
            ActivityType::RequestStatusUpdated => "REQUEST_STATUS_UPDATED",
            ActivityType::OfferCreated => "OFFER_CREATED",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityType::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| ParseTagError::new("activity type", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParkingSpace {
    pub id: i64,
    pub space_number: String,
    pub area: String,
    pub status: SpaceStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingSpaceCreateInput {
    pub space_number: String,
    pub area: String,
    #[serde(default)]
    pub status: Option<SpaceStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingSpaceUpdateInput {
    pub space_number: Option<String>,
    pub area: Option<String>,
    pub status: Option<SpaceStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Household {
    pub id: i64,
    pub household_number: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdCreateInput {
    pub household_number: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdUpdateInput {
    pub household_number: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub id: i64,
    pub parking_space_id: i64,
    pub household_id: i64,
    pub license_plate: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A rental joined with the identifiers people actually read
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RentalDetails {
    #[serde(flatten)]
    pub rental: Rental,
    pub space_number: Option<String>,
    pub household_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalCreateInput {
    pub parking_space_id: i64,
    pub household_id: i64,
    pub license_plate: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Mutable rental fields. Space, household and active flag only move through
/// create and end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalUpdateInput {
    pub license_plate: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: i64,
    pub activity_type: ActivityType,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub related_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RentalRequest {
    pub id: i64,
    pub name: String,
    pub contact: String,
    pub license_plate: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

/// Submitted by an unauthenticated requester. Any status sent along is
/// ignored; new requests always start out pending.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalRequestCreateInput {
    pub name: String,
    pub contact: String,
    pub license_plate: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParkingOffer {
    pub id: i64,
    pub request_id: i64,
    pub space_number: String,
    pub owner_name: String,
    pub owner_contact: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingOfferCreateInput {
    pub space_number: String,
    pub owner_name: String,
    pub owner_contact: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Dashboard counters, derived on read
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_spaces: i64,
    pub occupied_spaces: i64,
    pub available_spaces: i64,
    pub maintenance_spaces: i64,
    pub active_rentals_count: i64,
}

impl DashboardStats {
    pub fn from_spaces<'a>(
        spaces: impl IntoIterator<Item = &'a ParkingSpace>,
        active_rentals_count: i64,
    ) -> Self {
        let mut stats = DashboardStats {
            active_rentals_count,
            ..Default::default()
        };
        for space in spaces {
            stats.total_spaces += 1;
            match space.status {
                SpaceStatus::Available => stats.available_spaces += 1,
                SpaceStatus::Occupied => stats.occupied_spaces += 1,
                SpaceStatus::Maintenance => stats.maintenance_spaces += 1,
            }
        }
        stats
    }
}

/// Filter for listing parking spaces
#[derive(Debug, Clone, Default)]
pub struct ParkingSpaceFilter {
    pub status: Option<SpaceStatus>,
    pub area: Option<String>,
    /// Case-insensitive substring match on space number and notes
    pub search: Option<String>,
}

impl ParkingSpaceFilter {
    pub fn matches(&self, space: &ParkingSpace) -> bool {
        if let Some(status) = self.status {
            if space.status != status {
                return false;
            }
        }
        if let Some(area) = &self.area {
            if !space.area.eq_ignore_ascii_case(area) {
                return false;
            }
        }
        match &self.search {
            Some(term) => {
                contains_ignore_case(&space.space_number, term)
                    || space
                        .notes
                        .as_deref()
                        .is_some_and(|notes| contains_ignore_case(notes, term))
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HouseholdFilter {
    /// Case-insensitive substring match on household number and contact name
    pub search: Option<String>,
}

impl HouseholdFilter {
    pub fn matches(&self, household: &Household) -> bool {
        match &self.search {
            Some(term) => {
                contains_ignore_case(&household.household_number, term)
                    || household
                        .contact_name
                        .as_deref()
                        .is_some_and(|name| contains_ignore_case(name, term))
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RentalFilter {
    pub active: Option<bool>,
    pub parking_space_id: Option<i64>,
    pub household_id: Option<i64>,
}

impl RentalFilter {
    pub fn matches(&self, rental: &Rental) -> bool {
        self.active.map_or(true, |active| rental.is_active == active)
            && self
                .parking_space_id
                .map_or(true, |id| rental.parking_space_id == id)
            && self.household_id.map_or(true, |id| rental.household_id == id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RentalRequestFilter {
    pub status: Option<RequestStatus>,
}

impl RentalRequestFilter {
    pub fn matches(&self, request: &RentalRequest) -> bool {
        self.status.map_or(true, |status| request.status == status)
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn space(id: i64, number: &str, status: SpaceStatus) -> ParkingSpace {
        ParkingSpace {
            id,
            space_number: number.to_string(),
            area: "A".to_string(),
            status,
            notes: None,
        }
    }

    #[test]
    fn test_status_tags_round_trip_through_strings() {
        for status in [
            SpaceStatus::Available,
            SpaceStatus::Occupied,
            SpaceStatus::Maintenance,
        ] {
            assert_eq!(status.as_str().parse::<SpaceStatus>().unwrap(), status);
        }
        assert_eq!("matched".parse::<RequestStatus>().unwrap(), RequestStatus::Matched);
        assert!("PARKED".parse::<SpaceStatus>().is_err());
    }

    #[test]
    fn test_activity_type_parses_every_tag() {
        for tag in ActivityType::ALL {
            assert_eq!(tag.as_str().parse::<ActivityType>().unwrap(), tag);
        }
        let err = "RENTAL_DELETED".parse::<ActivityType>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown activity type: RENTAL_DELETED");
    }

    #[test]
    fn test_only_pending_requests_accept_offers() {
        assert!(RequestStatus::Pending.accepts_offers());
        assert!(!RequestStatus::Matched.accepts_offers());
        assert!(!RequestStatus::Expired.accepts_offers());
        assert!(!RequestStatus::Cancelled.accepts_offers());
    }

    #[test]
    fn test_dashboard_counts_add_up() {
        let spaces = vec![
            space(1, "A-01", SpaceStatus::Available),
            space(2, "A-02", SpaceStatus::Occupied),
            space(3, "A-03", SpaceStatus::Occupied),
            space(4, "B-01", SpaceStatus::Maintenance),
        ];
        let stats = DashboardStats::from_spaces(&spaces, 2);

        assert_eq!(
            stats,
            DashboardStats {
                total_spaces: 4,
                occupied_spaces: 2,
                available_spaces: 1,
                maintenance_spaces: 1,
                active_rentals_count: 2,
            }
        );
        assert_eq!(
            stats.occupied_spaces + stats.available_spaces + stats.maintenance_spaces,
            stats.total_spaces
        );
    }

    #[test]
    fn test_space_filter_combines_conditions() {
        let mut noted = space(1, "A-01", SpaceStatus::Available);
        noted.notes = Some("Near the EV charger".to_string());

        let filter = ParkingSpaceFilter {
            status: Some(SpaceStatus::Available),
            area: Some("a".to_string()),
            search: Some("charger".to_string()),
        };
        assert!(filter.matches(&noted));
        assert!(!filter.matches(&space(2, "A-02", SpaceStatus::Available)));
        assert!(!filter.matches(&space(3, "charger", SpaceStatus::Occupied)));
    }

    #[test]
    fn test_rental_request_serializes_camel_case() {
        let request = RentalRequest {
            id: 7,
            name: "X".to_string(),
            contact: "Y".to_string(),
            license_plate: "Z".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
            notes: None,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["licensePlate"], "Z");
        assert_eq!(json["startDate"], "2025-01-01");
        assert_eq!(json["status"], "PENDING");
    }
}
