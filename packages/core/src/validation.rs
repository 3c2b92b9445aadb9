// ABOUTME: Field-level validation for create and update inputs
// ABOUTME: Collects every problem in one pass so callers can report them together

use chrono::NaiveDate;
use std::fmt;

use crate::constants::{MAX_NOTES_LENGTH, MAX_TEXT_FIELD_LENGTH};
use crate::types::{
    HouseholdCreateInput, HouseholdUpdateInput, ParkingOfferCreateInput, ParkingSpaceCreateInput,
    ParkingSpaceUpdateInput, RentalCreateInput, RentalRequestCreateInput, RentalUpdateInput,
};

/// A single field that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Join errors into one human readable sentence
pub fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn required(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::new(field, "is required"));
    } else if value.chars().count() > MAX_TEXT_FIELD_LENGTH {
        errors.push(ValidationError::new(
            field,
            format!("must be at most {} characters", MAX_TEXT_FIELD_LENGTH),
        ));
    }
}

fn optional(errors: &mut Vec<ValidationError>, field: &str, value: Option<&str>) {
    if let Some(value) = value {
        required(errors, field, value);
    }
}

fn text(errors: &mut Vec<ValidationError>, field: &str, value: Option<&str>) {
    if let Some(value) = value {
        if value.chars().count() > MAX_TEXT_FIELD_LENGTH {
            errors.push(ValidationError::new(
                field,
                format!("must be at most {} characters", MAX_TEXT_FIELD_LENGTH),
            ));
        }
    }
}

fn notes(errors: &mut Vec<ValidationError>, value: Option<&str>) {
    if value.is_some_and(|n| n.chars().count() > MAX_NOTES_LENGTH) {
        errors.push(ValidationError::new(
            "notes",
            format!("must be at most {} characters", MAX_NOTES_LENGTH),
        ));
    }
}

/// End date must fall strictly after the start date
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Option<ValidationError> {
    (end <= start).then(|| ValidationError::new("endDate", "must be after startDate"))
}

pub fn validate_parking_space_create(input: &ParkingSpaceCreateInput) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    required(&mut errors, "spaceNumber", &input.space_number);
    required(&mut errors, "area", &input.area);
    notes(&mut errors, input.notes.as_deref());
    errors
}

pub fn validate_parking_space_update(input: &ParkingSpaceUpdateInput) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    optional(&mut errors, "spaceNumber", input.space_number.as_deref());
    optional(&mut errors, "area", input.area.as_deref());
    notes(&mut errors, input.notes.as_deref());
    errors
}

pub fn validate_household_create(input: &HouseholdCreateInput) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    required(&mut errors, "householdNumber", &input.household_number);
    text(&mut errors, "contactName", input.contact_name.as_deref());
    text(&mut errors, "contactPhone", input.contact_phone.as_deref());
    notes(&mut errors, input.notes.as_deref());
    errors
}

pub fn validate_household_update(input: &HouseholdUpdateInput) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    optional(&mut errors, "householdNumber", input.household_number.as_deref());
    text(&mut errors, "contactName", input.contact_name.as_deref());
    text(&mut errors, "contactPhone", input.contact_phone.as_deref());
    notes(&mut errors, input.notes.as_deref());
    errors
}

pub fn validate_rental_create(input: &RentalCreateInput) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if input.parking_space_id <= 0 {
        errors.push(ValidationError::new("parkingSpaceId", "must be a valid id"));
    }
    if input.household_id <= 0 {
        errors.push(ValidationError::new("householdId", "must be a valid id"));
    }
    required(&mut errors, "licensePlate", &input.license_plate);
    errors.extend(validate_date_range(input.start_date, input.end_date));
    notes(&mut errors, input.notes.as_deref());
    errors
}

/// Date order is checked against the merged record by the store, since
/// either side of the range may be absent here.
pub fn validate_rental_update(input: &RentalUpdateInput) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    optional(&mut errors, "licensePlate", input.license_plate.as_deref());
    if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
        errors.extend(validate_date_range(start, end));
    }
    notes(&mut errors, input.notes.as_deref());
    errors
}

pub fn validate_rental_request_create(input: &RentalRequestCreateInput) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    required(&mut errors, "name", &input.name);
    required(&mut errors, "contact", &input.contact);
    required(&mut errors, "licensePlate", &input.license_plate);
    errors.extend(validate_date_range(input.start_date, input.end_date));
    notes(&mut errors, input.notes.as_deref());
    errors
}

pub fn validate_parking_offer_create(input: &ParkingOfferCreateInput) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    required(&mut errors, "spaceNumber", &input.space_number);
    required(&mut errors, "ownerName", &input.owner_name);
    required(&mut errors, "ownerContact", &input.owner_contact);
    notes(&mut errors, input.notes.as_deref());
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_space_requires_number_and_area() {
        let input = ParkingSpaceCreateInput {
            space_number: "  ".to_string(),
            area: String::new(),
            status: None,
            notes: None,
        };
        let errors = validate_parking_space_create(&input);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "spaceNumber");
        assert_eq!(errors[1].field, "area");
    }

    #[test]
    fn test_rental_dates_must_be_ordered() {
        let mut input = RentalCreateInput {
            parking_space_id: 1,
            household_id: 1,
            license_plate: "ABC-123".to_string(),
            start_date: date(2025, 1, 1),
            end_date: date(2025, 2, 1),
            notes: None,
        };
        assert!(validate_rental_create(&input).is_empty());

        input.end_date = input.start_date;
        let errors = validate_rental_create(&input);
        assert_eq!(errors, vec![ValidationError::new("endDate", "must be after startDate")]);
    }

    #[test]
    fn test_partial_rental_update_skips_range_check() {
        let input = RentalUpdateInput {
            end_date: Some(date(2020, 1, 1)),
            ..Default::default()
        };
        assert!(validate_rental_update(&input).is_empty());
    }

    #[test]
    fn test_overlong_fields_are_rejected() {
        let input = ParkingOfferCreateInput {
            space_number: "B-02".to_string(),
            owner_name: "x".repeat(MAX_TEXT_FIELD_LENGTH + 1),
            owner_contact: "0900".to_string(),
            notes: Some("n".repeat(MAX_NOTES_LENGTH + 1)),
        };
        let errors = validate_parking_offer_create(&input);
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["ownerName", "notes"]);
    }

    #[test]
    fn test_describe_joins_messages() {
        let errors = vec![
            ValidationError::new("name", "is required"),
            ValidationError::new("endDate", "must be after startDate"),
        ];
        assert_eq!(
            describe(&errors),
            "name: is required; endDate: must be after startDate"
        );
    }
}
