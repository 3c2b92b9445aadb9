// ABOUTME: Behavioural contract shared by every ParkingStore backend
// ABOUTME: Each scenario runs against both the in-memory and SQLite stores

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::sync::Arc;

use parkshare_core::{
    ActivityType, HouseholdCreateInput, HouseholdFilter, ParkingOfferCreateInput,
    ParkingSpaceCreateInput, ParkingSpaceFilter, ParkingSpaceUpdateInput, RentalCreateInput,
    RentalFilter, RentalRequestCreateInput, RentalRequestFilter, RentalUpdateInput,
    RequestStatus, SpaceStatus,
};
use parkshare_storage::{
    MemoryStore, ParkingStore, SqliteStore, StorageConfig, StorageError, StorageFactory,
};

async fn stores() -> Vec<(&'static str, Arc<dyn ParkingStore>)> {
    let memory: Arc<dyn ParkingStore> = Arc::new(MemoryStore::new());
    let sqlite: Arc<dyn ParkingStore> = Arc::new(SqliteStore::in_memory().await.unwrap());
    sqlite.initialize().await.unwrap();
    vec![("memory", memory), ("sqlite", sqlite)]
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn space_input(number: &str, area: &str) -> ParkingSpaceCreateInput {
    ParkingSpaceCreateInput {
        space_number: number.to_string(),
        area: area.to_string(),
        status: None,
        notes: None,
    }
}

fn household_input(number: &str) -> HouseholdCreateInput {
    HouseholdCreateInput {
        household_number: number.to_string(),
        contact_name: Some("Lee".to_string()),
        contact_phone: None,
        notes: None,
    }
}

fn rental_input(space_id: i64, household_id: i64, end: NaiveDate) -> RentalCreateInput {
    RentalCreateInput {
        parking_space_id: space_id,
        household_id,
        license_plate: "ABC-123".to_string(),
        start_date: date(2025, 1, 1),
        end_date: end,
        notes: None,
    }
}

fn request_input() -> RentalRequestCreateInput {
    RentalRequestCreateInput {
        name: "Visitor".to_string(),
        contact: "555-0100".to_string(),
        license_plate: "XYZ-789".to_string(),
        start_date: date(2025, 3, 1),
        end_date: date(2025, 3, 5),
        notes: None,
    }
}

fn offer_input(space_number: &str) -> ParkingOfferCreateInput {
    ParkingOfferCreateInput {
        space_number: space_number.to_string(),
        owner_name: "Kim".to_string(),
        owner_contact: "555-0199".to_string(),
        notes: None,
    }
}

#[tokio::test]
async fn test_rental_lifecycle_couples_space_status() {
    for (name, store) in stores().await {
        let space = store
            .create_parking_space(space_input("A-01", "A"))
            .await
            .unwrap();
        let household = store.create_household(household_input("H-101")).await.unwrap();
        assert_eq!(space.status, SpaceStatus::Available, "{name}");

        let rental = store
            .create_rental(rental_input(space.id, household.id, date(2025, 1, 31)))
            .await
            .unwrap();
        assert!(rental.is_active, "{name}");
        let space_now = store.get_parking_space(space.id).await.unwrap().unwrap();
        assert_eq!(space_now.status, SpaceStatus::Occupied, "{name}");

        let err = store
            .create_rental(rental_input(space.id, household.id, date(2025, 2, 28)))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::BusinessRule(_)), "{name}");
        assert_eq!(err.to_string(), "Parking space A-01 is not available");

        let ended = store.end_rental(rental.id).await.unwrap().unwrap();
        assert!(!ended.is_active, "{name}");
        let space_now = store.get_parking_space(space.id).await.unwrap().unwrap();
        assert_eq!(space_now.status, SpaceStatus::Available, "{name}");

        let err = store.end_rental(rental.id).await.unwrap_err();
        assert!(matches!(err, StorageError::BusinessRule(_)), "{name}");
        assert!(store.end_rental(9999).await.unwrap().is_none(), "{name}");

        let types: Vec<ActivityType> = store
            .list_activity_logs(10)
            .await
            .unwrap()
            .into_iter()
            .map(|log| log.activity_type)
            .collect();
        assert_eq!(
            types,
            vec![
                ActivityType::RentalEnded,
                ActivityType::RentalCreated,
                ActivityType::HouseholdCreated,
                ActivityType::SpaceCreated,
            ],
            "{name}"
        );
    }
}

#[tokio::test]
async fn test_rental_requires_existing_available_space_and_household() {
    for (name, store) in stores().await {
        let household = store.create_household(household_input("H-1")).await.unwrap();
        let err = store
            .create_rental(rental_input(404, household.id, date(2025, 1, 31)))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)), "{name}");
        assert_eq!(err.to_string(), "Parking space not found");

        let space = store
            .create_parking_space(space_input("A-02", "A"))
            .await
            .unwrap();
        let err = store
            .create_rental(rental_input(space.id, 404, date(2025, 1, 31)))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Household not found", "{name}");

        let mut input = space_input("M-01", "B");
        input.status = Some(SpaceStatus::Maintenance);
        let maintenance = store.create_parking_space(input).await.unwrap();
        let err = store
            .create_rental(rental_input(maintenance.id, household.id, date(2025, 1, 31)))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Parking space M-01 is not available", "{name}");

        let rentals = store.list_rentals(&RentalFilter::default()).await.unwrap();
        assert!(rentals.is_empty(), "{name}");
    }
}

#[tokio::test]
async fn test_concurrent_rentals_of_one_space() {
    for (name, store) in stores().await {
        let space = store
            .create_parking_space(space_input("C-01", "C"))
            .await
            .unwrap();
        let first = store.create_household(household_input("H-1")).await.unwrap();
        let second = store.create_household(household_input("H-2")).await.unwrap();

        let (a, b) = tokio::join!(
            store.create_rental(rental_input(space.id, first.id, date(2025, 1, 31))),
            store.create_rental(rental_input(space.id, second.id, date(2025, 1, 31))),
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1, "{name}");

        let active = store
            .list_rentals(&RentalFilter {
                active: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(active.len(), 1, "{name}");
    }
}

#[tokio::test]
async fn test_unique_numbers_are_enforced() {
    for (name, store) in stores().await {
        let first = store
            .create_parking_space(space_input("A-01", "A"))
            .await
            .unwrap();
        let err = store
            .create_parking_space(space_input(" A-01 ", "B"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateSpaceNumber(_)), "{name}");

        let other = store
            .create_parking_space(space_input("A-02", "A"))
            .await
            .unwrap();
        let err = store
            .update_parking_space(
                other.id,
                ParkingSpaceUpdateInput {
                    space_number: Some("A-01".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateSpaceNumber(_)), "{name}");

        // Renaming a space to its own number is not a conflict
        let same = store
            .update_parking_space(
                first.id,
                ParkingSpaceUpdateInput {
                    space_number: Some("A-01".to_string()),
                    notes: Some("near the lift".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(same.notes.as_deref(), Some("near the lift"), "{name}");

        store.create_household(household_input("H-1")).await.unwrap();
        let err = store
            .create_household(household_input("H-1"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, StorageError::DuplicateHouseholdNumber(_)),
            "{name}"
        );
    }
}

#[tokio::test]
async fn test_delete_guards_keep_rental_history() {
    for (name, store) in stores().await {
        let space = store
            .create_parking_space(space_input("D-01", "D"))
            .await
            .unwrap();
        let household = store.create_household(household_input("H-9")).await.unwrap();
        let rental = store
            .create_rental(rental_input(space.id, household.id, date(2025, 1, 31)))
            .await
            .unwrap();

        let err = store.delete_parking_space(space.id).await.unwrap_err();
        assert!(matches!(err, StorageError::BusinessRule(_)), "{name}");
        let err = store.delete_household(household.id).await.unwrap_err();
        assert!(matches!(err, StorageError::BusinessRule(_)), "{name}");
        assert!(!store.delete_parking_space(9999).await.unwrap(), "{name}");

        store.end_rental(rental.id).await.unwrap();
        assert!(store.delete_parking_space(space.id).await.unwrap(), "{name}");
        assert!(store.get_parking_space(space.id).await.unwrap().is_none());
        let kept = store.get_rental(rental.id).await.unwrap();
        assert!(kept.is_some_and(|r| !r.is_active), "{name}");

        let history = store
            .list_rentals(&RentalFilter {
                household_id: Some(household.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(history.len(), 1, "{name}");
        assert_eq!(history[0].space_number, None, "{name}");
        assert_eq!(history[0].household_number.as_deref(), Some("H-9"), "{name}");

        assert!(store.delete_household(household.id).await.unwrap(), "{name}");
        assert!(store.get_rental(rental.id).await.unwrap().is_some(), "{name}");

        let latest = store.list_activity_logs(1).await.unwrap();
        assert_eq!(latest[0].activity_type, ActivityType::HouseholdDeleted);
    }
}

#[tokio::test]
async fn test_status_override_rules() {
    for (name, store) in stores().await {
        let space = store
            .create_parking_space(space_input("S-01", "S"))
            .await
            .unwrap();

        let occupy = ParkingSpaceUpdateInput {
            status: Some(SpaceStatus::Occupied),
            ..Default::default()
        };
        let err = store
            .update_parking_space(space.id, occupy)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::BusinessRule(_)), "{name}");

        let mut initial = space_input("S-02", "S");
        initial.status = Some(SpaceStatus::Occupied);
        assert!(store.create_parking_space(initial).await.is_err(), "{name}");

        let maintenance = ParkingSpaceUpdateInput {
            status: Some(SpaceStatus::Maintenance),
            ..Default::default()
        };
        let updated = store
            .update_parking_space(space.id, maintenance.clone())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, SpaceStatus::Maintenance, "{name}");
        let logs = store.list_activity_logs(1).await.unwrap();
        assert_eq!(
            logs[0].description,
            "Parking space S-01 updated (status AVAILABLE -> MAINTENANCE)"
        );

        let back = ParkingSpaceUpdateInput {
            status: Some(SpaceStatus::Available),
            ..Default::default()
        };
        store.update_parking_space(space.id, back).await.unwrap();
        let household = store.create_household(household_input("H-5")).await.unwrap();
        store
            .create_rental(rental_input(space.id, household.id, date(2025, 1, 31)))
            .await
            .unwrap();
        let err = store
            .update_parking_space(space.id, maintenance)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::BusinessRule(_)), "{name}");

        assert!(store
            .update_parking_space(9999, ParkingSpaceUpdateInput::default())
            .await
            .unwrap()
            .is_none());
    }
}

#[tokio::test]
async fn test_rental_update_revalidates_dates() {
    for (name, store) in stores().await {
        let space = store
            .create_parking_space(space_input("U-01", "U"))
            .await
            .unwrap();
        let household = store.create_household(household_input("H-3")).await.unwrap();
        let rental = store
            .create_rental(rental_input(space.id, household.id, date(2025, 1, 31)))
            .await
            .unwrap();

        let err = store
            .update_rental(
                rental.id,
                RentalUpdateInput {
                    end_date: Some(date(2024, 12, 1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)), "{name}");

        let updated = store
            .update_rental(
                rental.id,
                RentalUpdateInput {
                    license_plate: Some("NEW-001".to_string()),
                    end_date: Some(date(2025, 2, 15)),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.license_plate, "NEW-001", "{name}");
        assert_eq!(updated.end_date, date(2025, 2, 15), "{name}");
        assert_eq!(updated.parking_space_id, space.id, "{name}");

        let stored = store.get_rental(rental.id).await.unwrap().unwrap();
        assert_eq!(stored.license_plate, "NEW-001", "{name}");
        assert_eq!(stored.end_date, updated.end_date, "{name}");
        assert!(store
            .update_rental(9999, RentalUpdateInput::default())
            .await
            .unwrap()
            .is_none());
    }
}

#[tokio::test]
async fn test_expiring_rentals_window() {
    for (name, store) in stores().await {
        let household = store.create_household(household_input("H-7")).await.unwrap();
        let mut ids = Vec::new();
        for (number, end) in [
            ("E-01", date(2025, 3, 8)),
            ("E-02", date(2025, 3, 3)),
            ("E-03", date(2025, 3, 9)),
            ("E-04", date(2025, 2, 28)),
            ("E-05", date(2025, 3, 2)),
        ] {
            let space = store
                .create_parking_space(space_input(number, "E"))
                .await
                .unwrap();
            let rental = store
                .create_rental(rental_input(space.id, household.id, end))
                .await
                .unwrap();
            ids.push(rental.id);
        }
        // An ended rental never counts as expiring
        store.end_rental(ids[4]).await.unwrap();

        let expiring = store
            .get_expiring_rentals(date(2025, 3, 1), 7)
            .await
            .unwrap();
        let numbers: Vec<&str> = expiring
            .iter()
            .filter_map(|d| d.space_number.as_deref())
            .collect();
        assert_eq!(numbers, vec!["E-02", "E-01"], "{name}");
        assert_eq!(expiring[0].household_number.as_deref(), Some("H-7"));
    }
}

#[tokio::test]
async fn test_rental_request_and_offer_flow() {
    for (name, store) in stores().await {
        let request = store.create_rental_request(request_input()).await.unwrap();
        assert_eq!(request.status, RequestStatus::Pending, "{name}");

        let offer = store
            .create_parking_offer(request.id, offer_input(" B-12 "))
            .await
            .unwrap();
        assert_eq!(offer.space_number, "B-12", "{name}");
        assert_eq!(offer.request_id, request.id);

        let matched = store.get_rental_request(request.id).await.unwrap().unwrap();
        assert_eq!(matched.status, RequestStatus::Matched, "{name}");

        let err = store
            .create_parking_offer(request.id, offer_input("B-13"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::BusinessRule(_)), "{name}");

        let err = store
            .create_parking_offer(9999, offer_input("B-14"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)), "{name}");

        let offers = store.list_parking_offers(request.id).await.unwrap();
        assert_eq!(offers.len(), 1, "{name}");

        let other = store.create_rental_request(request_input()).await.unwrap();
        let cancelled = store
            .update_rental_request_status(other.id, RequestStatus::Cancelled)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cancelled.status, RequestStatus::Cancelled);
        assert!(store
            .create_parking_offer(other.id, offer_input("B-15"))
            .await
            .is_err());
        assert!(store
            .update_rental_request_status(9999, RequestStatus::Expired)
            .await
            .unwrap()
            .is_none());

        let pending = store
            .list_rental_requests(&RentalRequestFilter {
                status: Some(RequestStatus::Pending),
            })
            .await
            .unwrap();
        assert!(pending.is_empty(), "{name}");

        let types: Vec<ActivityType> = store
            .list_activity_logs(20)
            .await
            .unwrap()
            .into_iter()
            .map(|log| log.activity_type)
            .collect();
        assert_eq!(
            types,
            vec![
                ActivityType::RequestStatusUpdated,
                ActivityType::RequestCreated,
                ActivityType::OfferCreated,
                ActivityType::RequestCreated,
            ],
            "{name}"
        );
    }
}

#[tokio::test]
async fn test_list_filters() {
    for (name, store) in stores().await {
        let mut notes = space_input("A-01", "North");
        notes.notes = Some("Covered spot".to_string());
        let a1 = store.create_parking_space(notes).await.unwrap();
        store
            .create_parking_space(space_input("A-02", "north"))
            .await
            .unwrap();
        store
            .create_parking_space(space_input("B-01", "South"))
            .await
            .unwrap();

        let north = store
            .list_parking_spaces(&ParkingSpaceFilter {
                area: Some("NORTH".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(north.len(), 2, "{name}");

        let covered = store
            .list_parking_spaces(&ParkingSpaceFilter {
                search: Some("covered".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(covered.len(), 1, "{name}");
        assert_eq!(covered[0].id, a1.id);

        let household = store.create_household(household_input("H-200")).await.unwrap();
        store
            .create_rental(rental_input(a1.id, household.id, date(2025, 1, 31)))
            .await
            .unwrap();

        let available = store
            .list_parking_spaces(&ParkingSpaceFilter {
                status: Some(SpaceStatus::Available),
                ..Default::default()
            })
            .await
            .unwrap();
        let numbers: Vec<String> = available.into_iter().map(|s| s.space_number).collect();
        assert_eq!(numbers, vec!["A-02".to_string(), "B-01".to_string()], "{name}");

        let by_household = store
            .list_rentals(&RentalFilter {
                household_id: Some(household.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_household.len(), 1, "{name}");
        assert_eq!(by_household[0].space_number.as_deref(), Some("A-01"));

        let found = store
            .list_households(&HouseholdFilter {
                search: Some("lee".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1, "{name}");
    }
}

#[tokio::test]
async fn test_dashboard_stats() {
    for (name, store) in stores().await {
        let household = store.create_household(household_input("H-1")).await.unwrap();
        let rented = store
            .create_parking_space(space_input("X-01", "X"))
            .await
            .unwrap();
        store
            .create_parking_space(space_input("X-02", "X"))
            .await
            .unwrap();
        let mut input = space_input("X-03", "X");
        input.status = Some(SpaceStatus::Maintenance);
        store.create_parking_space(input).await.unwrap();
        store
            .create_rental(rental_input(rented.id, household.id, date(2025, 1, 31)))
            .await
            .unwrap();

        let stats = store.get_dashboard_stats().await.unwrap();
        assert_eq!(stats.total_spaces, 3, "{name}");
        assert_eq!(stats.occupied_spaces, 1, "{name}");
        assert_eq!(stats.available_spaces, 1, "{name}");
        assert_eq!(stats.maintenance_spaces, 1, "{name}");
        assert_eq!(stats.active_rentals_count, 1, "{name}");
    }
}

#[tokio::test]
async fn test_activity_log_limit_and_order() {
    for (name, store) in stores().await {
        for i in 0..5 {
            store
                .create_parking_space(space_input(&format!("L-{i}"), "L"))
                .await
                .unwrap();
        }
        let logs = store.list_activity_logs(3).await.unwrap();
        assert_eq!(logs.len(), 3, "{name}");
        assert!(logs[0].id > logs[1].id && logs[1].id > logs[2].id, "{name}");
        assert_eq!(logs[0].description, "Parking space L-4 created in area L");
    }
}

#[tokio::test]
async fn test_sqlite_data_survives_reopen() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("parkshare.db");

    {
        let store = StorageFactory::create_storage(StorageConfig::sqlite(&db_path))
            .await
            .unwrap();
        store
            .create_parking_space(space_input("P-01", "P"))
            .await
            .unwrap();
    }

    let store = StorageFactory::create_storage(StorageConfig::sqlite(&db_path))
        .await
        .unwrap();
    let space = store.get_parking_space_by_number("P-01").await.unwrap();
    assert!(space.is_some());
    assert_eq!(store.list_activity_logs(10).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_file_backed_store_serialises_concurrent_writers() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = StorageFactory::create_storage(StorageConfig::sqlite(
        temp_dir.path().join("parkshare.db"),
    ))
    .await
    .unwrap();
    let first = store.create_household(household_input("H-1")).await.unwrap().id;
    let second = store.create_household(household_input("H-2")).await.unwrap().id;

    let rent = |space_id: i64, household_id: i64| {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .create_rental(rental_input(space_id, household_id, date(2025, 1, 31)))
                .await
        })
    };

    for round in 0..10 {
        let shared = store
            .create_parking_space(space_input(&format!("R-{round}"), "R"))
            .await
            .unwrap();
        let (a, b) = (rent(shared.id, first), rent(shared.id, second));
        let results = [a.await.unwrap(), b.await.unwrap()];
        assert_eq!(
            results.iter().filter(|r| r.is_ok()).count(),
            1,
            "round {round}"
        );
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(StorageError::BusinessRule(_)))),
            "round {round}: {results:?}"
        );

        let left = store
            .create_parking_space(space_input(&format!("L-{round}"), "L"))
            .await
            .unwrap();
        let right = store
            .create_parking_space(space_input(&format!("D-{round}"), "D"))
            .await
            .unwrap();
        let (a, b) = (rent(left.id, first), rent(right.id, second));
        assert!(a.await.unwrap().is_ok(), "round {round}");
        assert!(b.await.unwrap().is_ok(), "round {round}");
    }

    let active = store
        .list_rentals(&RentalFilter {
            active: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(active.len(), 30);
    let stats = store.get_dashboard_stats().await.unwrap();
    assert_eq!(stats.occupied_spaces, 30);
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    for (name, store) in stores().await {
        for number in ["A_1", "AB1", "C%1", "CD1"] {
            store
                .create_parking_space(space_input(number, "W"))
                .await
                .unwrap();
        }
        for number in ["12_01", "12301"] {
            store.create_household(household_input(number)).await.unwrap();
        }

        let search = |term: &str| ParkingSpaceFilter {
            search: Some(term.to_string()),
            ..Default::default()
        };
        let spaces = store.list_parking_spaces(&search("a_")).await.unwrap();
        let numbers: Vec<&str> = spaces.iter().map(|s| s.space_number.as_str()).collect();
        assert_eq!(numbers, vec!["A_1"], "{name}");

        let spaces = store.list_parking_spaces(&search("%")).await.unwrap();
        assert_eq!(spaces.len(), 1, "{name}");
        assert_eq!(spaces[0].space_number, "C%1", "{name}");

        let households = store
            .list_households(&HouseholdFilter {
                search: Some("2_0".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(households.len(), 1, "{name}");
        assert_eq!(households[0].household_number, "12_01", "{name}");
    }
}
