// ABOUTME: SQLite entity store using sqlx
// ABOUTME: Coupled writes run in one transaction with conditional updates guarding state changes

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Executor, QueryBuilder, Row, Sqlite, Transaction};
use std::str::FromStr;
use tracing::{debug, info};

use parkshare_core::{
    ActivityLog, DashboardStats, Household, HouseholdCreateInput, HouseholdFilter,
    HouseholdUpdateInput, ParkingOffer, ParkingOfferCreateInput, ParkingSpace,
    ParkingSpaceCreateInput, ParkingSpaceFilter, ParkingSpaceUpdateInput, ParseTagError, Rental,
    RentalCreateInput, RentalDetails, RentalFilter, RentalRequest, RentalRequestCreateInput,
    RentalRequestFilter, RentalUpdateInput, RequestStatus, SpaceStatus,
};

use crate::rules::{self, NewActivity};
use crate::{
    ParkingStore, StorageBackend, StorageConfig, StorageError, StorageProvider, StorageResult,
};

const RENTAL_DETAILS_SELECT: &str = r#"
    SELECT r.*, ps.space_number AS space_number, h.household_number AS household_number
    FROM rentals r
    LEFT JOIN parking_spaces ps ON ps.id = r.parking_space_id
    LEFT JOIN households h ON h.id = r.household_id
"#;

/// SQLite implementation of ParkingStore
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file named by the config
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        let database_path = match &config.provider {
            StorageProvider::Sqlite { path } => path,
            StorageProvider::Memory => {
                return Err(StorageError::InvalidConfig(
                    "SQLite storage requires a database path".to_string(),
                ))
            }
        };

        // Ensure parent directory exists
        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
            }
        }

        let journal_mode = if config.enable_wal {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        };
        let timeout = std::time::Duration::from_secs(config.busy_timeout_seconds);

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(journal_mode)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(timeout);

        debug!("Connecting to SQLite database at {:?}", database_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(timeout)
            .connect_with(options)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(Self { pool })
    }

    /// Private in-memory database. A single long-lived connection keeps the
    /// data alive for the lifetime of the pool.
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Takes the write lock at BEGIN so concurrent writers queue on the busy
    /// timeout rather than failing when a read transaction upgrades
    async fn begin_write(&self) -> StorageResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }
}

/// Substring pattern matching `term` literally
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn parse_tag<T>(value: &str) -> StorageResult<T>
where
    T: FromStr<Err = ParseTagError>,
{
    value
        .parse()
        .map_err(|e: ParseTagError| StorageError::Database(e.to_string()))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn row_to_space(row: &SqliteRow) -> StorageResult<ParkingSpace> {
    let status: String = row.try_get("status")?;
    Ok(ParkingSpace {
        id: row.try_get("id")?,
        space_number: row.try_get("space_number")?,
        area: row.try_get("area")?,
        status: parse_tag(&status)?,
        notes: row.try_get("notes")?,
    })
}

fn row_to_household(row: &SqliteRow) -> StorageResult<Household> {
    Ok(Household {
        id: row.try_get("id")?,
        household_number: row.try_get("household_number")?,
        contact_name: row.try_get("contact_name")?,
        contact_phone: row.try_get("contact_phone")?,
        notes: row.try_get("notes")?,
    })
}

fn row_to_rental(row: &SqliteRow) -> StorageResult<Rental> {
    Ok(Rental {
        id: row.try_get("id")?,
        parking_space_id: row.try_get("parking_space_id")?,
        household_id: row.try_get("household_id")?,
        license_plate: row.try_get("license_plate")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        is_active: row.try_get("is_active")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_rental_details(row: &SqliteRow) -> StorageResult<RentalDetails> {
    Ok(RentalDetails {
        rental: row_to_rental(row)?,
        space_number: row.try_get("space_number")?,
        household_number: row.try_get("household_number")?,
    })
}

fn row_to_activity_log(row: &SqliteRow) -> StorageResult<ActivityLog> {
    let activity_type: String = row.try_get("activity_type")?;
    Ok(ActivityLog {
        id: row.try_get("id")?,
        activity_type: parse_tag(&activity_type)?,
        description: row.try_get("description")?,
        timestamp: row.try_get("timestamp")?,
        related_id: row.try_get("related_id")?,
    })
}

fn row_to_request(row: &SqliteRow) -> StorageResult<RentalRequest> {
    let status: String = row.try_get("status")?;
    Ok(RentalRequest {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        contact: row.try_get("contact")?,
        license_plate: row.try_get("license_plate")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        notes: row.try_get("notes")?,
        status: parse_tag(&status)?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_offer(row: &SqliteRow) -> StorageResult<ParkingOffer> {
    Ok(ParkingOffer {
        id: row.try_get("id")?,
        request_id: row.try_get("request_id")?,
        space_number: row.try_get("space_number")?,
        owner_name: row.try_get("owner_name")?,
        owner_contact: row.try_get("owner_contact")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}

async fn insert_activity<'e, E>(executor: E, entry: &NewActivity) -> StorageResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO activity_logs (activity_type, description, timestamp, related_id) VALUES (?, ?, ?, ?)",
    )
    .bind(entry.activity_type.as_str())
    .bind(&entry.description)
    .bind(Utc::now())
    .bind(entry.related_id)
    .execute(executor)
    .await?;
    Ok(())
}

async fn fetch_space<'e, E>(executor: E, id: i64) -> StorageResult<Option<ParkingSpace>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("SELECT * FROM parking_spaces WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .as_ref()
        .map(row_to_space)
        .transpose()
}

async fn fetch_household<'e, E>(executor: E, id: i64) -> StorageResult<Option<Household>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("SELECT * FROM households WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .as_ref()
        .map(row_to_household)
        .transpose()
}

async fn fetch_rental<'e, E>(executor: E, id: i64) -> StorageResult<Option<Rental>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("SELECT * FROM rentals WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .as_ref()
        .map(row_to_rental)
        .transpose()
}

async fn fetch_request<'e, E>(executor: E, id: i64) -> StorageResult<Option<RentalRequest>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("SELECT * FROM rental_requests WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .as_ref()
        .map(row_to_request)
        .transpose()
}

async fn has_active_rental<'e, E>(executor: E, column: &str, id: i64) -> StorageResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!(
        "SELECT COUNT(*) FROM rentals WHERE {} = ? AND is_active = 1",
        column
    );
    let count: i64 = sqlx::query_scalar(&query)
        .bind(id)
        .fetch_one(executor)
        .await?;
    Ok(count > 0)
}

#[async_trait]
impl ParkingStore for SqliteStore {
    async fn initialize(&self) -> StorageResult<()> {
        info!("Initializing SQLite storage with migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;

        info!("SQLite storage initialized successfully");
        Ok(())
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Sqlite
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_parking_spaces(
        &self,
        filter: &ParkingSpaceFilter,
    ) -> StorageResult<Vec<ParkingSpace>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM parking_spaces WHERE 1 = 1");
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(area) = &filter.area {
            query
                .push(" AND area = ")
                .push_bind(area.clone())
                .push(" COLLATE NOCASE");
        }
        if let Some(term) = &filter.search {
            let pattern = like_pattern(term);
            query
                .push(" AND (space_number LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR notes LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        query.push(" ORDER BY id");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_space).collect()
    }

    async fn get_parking_space(&self, id: i64) -> StorageResult<Option<ParkingSpace>> {
        fetch_space(&self.pool, id).await
    }

    async fn get_parking_space_by_number(
        &self,
        space_number: &str,
    ) -> StorageResult<Option<ParkingSpace>> {
        sqlx::query("SELECT * FROM parking_spaces WHERE space_number = ?")
            .bind(space_number)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(row_to_space)
            .transpose()
    }

    async fn create_parking_space(
        &self,
        input: ParkingSpaceCreateInput,
    ) -> StorageResult<ParkingSpace> {
        let status = input.status.unwrap_or_default();
        rules::ensure_initial_space_status(status)?;
        let space_number = input.space_number.trim().to_string();

        let mut tx = self.begin_write().await?;
        let result = sqlx::query(
            "INSERT INTO parking_spaces (space_number, area, status, notes) VALUES (?, ?, ?, ?)",
        )
        .bind(&space_number)
        .bind(&input.area)
        .bind(status.as_str())
        .bind(&input.notes)
        .execute(&mut *tx)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(e) if is_unique_violation(&e) => {
                return Err(StorageError::DuplicateSpaceNumber(space_number))
            }
            Err(e) => return Err(StorageError::Sqlx(e)),
        };

        let space = ParkingSpace {
            id,
            space_number,
            area: input.area,
            status,
            notes: input.notes,
        };
        insert_activity(&mut *tx, &NewActivity::space_created(&space)).await?;
        tx.commit().await?;

        debug!("Created parking space {} with ID {}", space.space_number, id);
        Ok(space)
    }

    async fn update_parking_space(
        &self,
        id: i64,
        input: ParkingSpaceUpdateInput,
    ) -> StorageResult<Option<ParkingSpace>> {
        let mut tx = self.begin_write().await?;
        let Some(existing) = fetch_space(&mut *tx, id).await? else {
            return Ok(None);
        };

        let updated = rules::merge_space(&existing, input);
        let rented = has_active_rental(&mut *tx, "parking_space_id", id).await?;
        rules::ensure_status_override(&existing, updated.status, rented)?;

        let result = sqlx::query(
            "UPDATE parking_spaces SET space_number = ?, area = ?, status = ?, notes = ? WHERE id = ?",
        )
        .bind(&updated.space_number)
        .bind(&updated.area)
        .bind(updated.status.as_str())
        .bind(&updated.notes)
        .bind(id)
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StorageError::DuplicateSpaceNumber(updated.space_number))
            }
            Err(e) => return Err(StorageError::Sqlx(e)),
        }

        insert_activity(&mut *tx, &NewActivity::space_updated(&existing, &updated)).await?;
        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete_parking_space(&self, id: i64) -> StorageResult<bool> {
        let mut tx = self.begin_write().await?;
        let Some(space) = fetch_space(&mut *tx, id).await? else {
            return Ok(false);
        };
        if has_active_rental(&mut *tx, "parking_space_id", id).await? {
            return Err(rules::space_in_use(&space.space_number));
        }

        sqlx::query("DELETE FROM parking_spaces WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_activity(&mut *tx, &NewActivity::space_deleted(&space)).await?;
        tx.commit().await?;

        debug!("Deleted parking space {}", id);
        Ok(true)
    }

    async fn list_households(&self, filter: &HouseholdFilter) -> StorageResult<Vec<Household>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM households WHERE 1 = 1");
        if let Some(term) = &filter.search {
            let pattern = like_pattern(term);
            query
                .push(" AND (household_number LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR contact_name LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        query.push(" ORDER BY id");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_household).collect()
    }

    async fn get_household(&self, id: i64) -> StorageResult<Option<Household>> {
        fetch_household(&self.pool, id).await
    }

    async fn get_household_by_number(
        &self,
        household_number: &str,
    ) -> StorageResult<Option<Household>> {
        sqlx::query("SELECT * FROM households WHERE household_number = ?")
            .bind(household_number)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(row_to_household)
            .transpose()
    }

    async fn create_household(&self, input: HouseholdCreateInput) -> StorageResult<Household> {
        let household_number = input.household_number.trim().to_string();

        let mut tx = self.begin_write().await?;
        let result = sqlx::query(
            "INSERT INTO households (household_number, contact_name, contact_phone, notes) VALUES (?, ?, ?, ?)",
        )
        .bind(&household_number)
        .bind(&input.contact_name)
        .bind(&input.contact_phone)
        .bind(&input.notes)
        .execute(&mut *tx)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(e) if is_unique_violation(&e) => {
                return Err(StorageError::DuplicateHouseholdNumber(household_number))
            }
            Err(e) => return Err(StorageError::Sqlx(e)),
        };

        let household = Household {
            id,
            household_number,
            contact_name: input.contact_name,
            contact_phone: input.contact_phone,
            notes: input.notes,
        };
        insert_activity(&mut *tx, &NewActivity::household_created(&household)).await?;
        tx.commit().await?;
        Ok(household)
    }

    async fn update_household(
        &self,
        id: i64,
        input: HouseholdUpdateInput,
    ) -> StorageResult<Option<Household>> {
        let mut tx = self.begin_write().await?;
        let Some(existing) = fetch_household(&mut *tx, id).await? else {
            return Ok(None);
        };

        let updated = rules::merge_household(&existing, input);
        let result = sqlx::query(
            "UPDATE households SET household_number = ?, contact_name = ?, contact_phone = ?, notes = ? WHERE id = ?",
        )
        .bind(&updated.household_number)
        .bind(&updated.contact_name)
        .bind(&updated.contact_phone)
        .bind(&updated.notes)
        .bind(id)
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StorageError::DuplicateHouseholdNumber(
                    updated.household_number,
                ))
            }
            Err(e) => return Err(StorageError::Sqlx(e)),
        }

        insert_activity(&mut *tx, &NewActivity::household_updated(&updated)).await?;
        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete_household(&self, id: i64) -> StorageResult<bool> {
        let mut tx = self.begin_write().await?;
        let Some(household) = fetch_household(&mut *tx, id).await? else {
            return Ok(false);
        };
        if has_active_rental(&mut *tx, "household_id", id).await? {
            return Err(rules::household_in_use(&household.household_number));
        }

        sqlx::query("DELETE FROM households WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_activity(&mut *tx, &NewActivity::household_deleted(&household)).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn list_rentals(&self, filter: &RentalFilter) -> StorageResult<Vec<RentalDetails>> {
        let mut query = QueryBuilder::<Sqlite>::new(RENTAL_DETAILS_SELECT);
        query.push(" WHERE 1 = 1");
        if let Some(active) = filter.active {
            query.push(" AND r.is_active = ").push_bind(active);
        }
        if let Some(space_id) = filter.parking_space_id {
            query.push(" AND r.parking_space_id = ").push_bind(space_id);
        }
        if let Some(household_id) = filter.household_id {
            query.push(" AND r.household_id = ").push_bind(household_id);
        }
        query.push(" ORDER BY r.id");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_rental_details).collect()
    }

    async fn get_rental(&self, id: i64) -> StorageResult<Option<Rental>> {
        fetch_rental(&self.pool, id).await
    }

    async fn get_expiring_rentals(
        &self,
        today: NaiveDate,
        days: i64,
    ) -> StorageResult<Vec<RentalDetails>> {
        let horizon = today + Duration::days(days);
        let query = format!(
            "{} WHERE r.is_active = 1 AND r.end_date >= ? AND r.end_date <= ? ORDER BY r.end_date, r.id",
            RENTAL_DETAILS_SELECT
        );
        let rows = sqlx::query(&query)
            .bind(today)
            .bind(horizon)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_rental_details).collect()
    }

    async fn create_rental(&self, input: RentalCreateInput) -> StorageResult<Rental> {
        let mut tx = self.begin_write().await?;

        let space = fetch_space(&mut *tx, input.parking_space_id)
            .await?
            .ok_or_else(rules::space_not_found)?;
        let household = fetch_household(&mut *tx, input.household_id)
            .await?
            .ok_or_else(rules::household_not_found)?;
        rules::ensure_space_rentable(&space)?;

        // Conditional flip; a concurrent rental of the same space loses here
        let flipped = sqlx::query(
            "UPDATE parking_spaces SET status = 'OCCUPIED' WHERE id = ? AND status = 'AVAILABLE'",
        )
        .bind(space.id)
        .execute(&mut *tx)
        .await?;
        if flipped.rows_affected() == 0 {
            return Err(rules::space_not_available(&space.space_number));
        }

        let now: DateTime<Utc> = Utc::now();
        let license_plate = input.license_plate.trim().to_string();
        let result = sqlx::query(
            r#"
            INSERT INTO rentals (
                parking_space_id, household_id, license_plate, start_date, end_date,
                is_active, notes, created_at
            ) VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(space.id)
        .bind(household.id)
        .bind(&license_plate)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.notes)
        .bind(now)
        .execute(&mut *tx)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(e) if is_unique_violation(&e) => {
                return Err(rules::space_not_available(&space.space_number))
            }
            Err(e) => return Err(StorageError::Sqlx(e)),
        };

        let rental = Rental {
            id,
            parking_space_id: space.id,
            household_id: household.id,
            license_plate,
            start_date: input.start_date,
            end_date: input.end_date,
            is_active: true,
            notes: input.notes,
            created_at: now,
        };
        insert_activity(
            &mut *tx,
            &NewActivity::rental_created(&rental, &space, &household),
        )
        .await?;
        tx.commit().await?;

        info!("Rental {} created for space {}", id, space.space_number);
        Ok(rental)
    }

    async fn update_rental(
        &self,
        id: i64,
        input: RentalUpdateInput,
    ) -> StorageResult<Option<Rental>> {
        let mut tx = self.begin_write().await?;
        let Some(existing) = fetch_rental(&mut *tx, id).await? else {
            return Ok(None);
        };

        let updated = rules::merge_rental(&existing, input)?;
        sqlx::query(
            "UPDATE rentals SET license_plate = ?, start_date = ?, end_date = ?, notes = ? WHERE id = ?",
        )
        .bind(&updated.license_plate)
        .bind(updated.start_date)
        .bind(updated.end_date)
        .bind(&updated.notes)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        insert_activity(&mut *tx, &NewActivity::rental_updated(&updated)).await?;
        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn end_rental(&self, id: i64) -> StorageResult<Option<Rental>> {
        let mut tx = self.begin_write().await?;
        let Some(mut rental) = fetch_rental(&mut *tx, id).await? else {
            return Ok(None);
        };
        rules::ensure_rental_active(&rental)?;

        let ended = sqlx::query("UPDATE rentals SET is_active = 0 WHERE id = ? AND is_active = 1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if ended.rows_affected() == 0 {
            return Err(rules::rental_already_ended(id));
        }

        sqlx::query("UPDATE parking_spaces SET status = 'AVAILABLE' WHERE id = ?")
            .bind(rental.parking_space_id)
            .execute(&mut *tx)
            .await?;

        let space_number = fetch_space(&mut *tx, rental.parking_space_id)
            .await?
            .map(|s| s.space_number)
            .unwrap_or_default();
        rental.is_active = false;
        insert_activity(&mut *tx, &NewActivity::rental_ended(&rental, &space_number)).await?;
        tx.commit().await?;

        info!("Rental {} ended", id);
        Ok(Some(rental))
    }

    async fn list_activity_logs(&self, limit: usize) -> StorageResult<Vec<ActivityLog>> {
        let rows = sqlx::query("SELECT * FROM activity_logs ORDER BY id DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_activity_log).collect()
    }

    async fn get_dashboard_stats(&self) -> StorageResult<DashboardStats> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM parking_spaces GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut stats = DashboardStats::default();
        for row in &rows {
            let status: String = row.try_get("status")?;
            let count: i64 = row.try_get("count")?;
            stats.total_spaces += count;
            match parse_tag::<SpaceStatus>(&status)? {
                SpaceStatus::Available => stats.available_spaces = count,
                SpaceStatus::Occupied => stats.occupied_spaces = count,
                SpaceStatus::Maintenance => stats.maintenance_spaces = count,
            }
        }

        stats.active_rentals_count =
            sqlx::query_scalar("SELECT COUNT(*) FROM rentals WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await?;
        Ok(stats)
    }

    async fn list_rental_requests(
        &self,
        filter: &RentalRequestFilter,
    ) -> StorageResult<Vec<RentalRequest>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM rental_requests WHERE 1 = 1");
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY id");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_request).collect()
    }

    async fn get_rental_request(&self, id: i64) -> StorageResult<Option<RentalRequest>> {
        fetch_request(&self.pool, id).await
    }

    async fn create_rental_request(
        &self,
        input: RentalRequestCreateInput,
    ) -> StorageResult<RentalRequest> {
        let now: DateTime<Utc> = Utc::now();
        let license_plate = input.license_plate.trim().to_string();

        let mut tx = self.begin_write().await?;
        let done = sqlx::query(
            r#"
            INSERT INTO rental_requests (
                name, contact, license_plate, start_date, end_date, notes, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.name)
        .bind(&input.contact)
        .bind(&license_plate)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.notes)
        .bind(RequestStatus::Pending.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let request = RentalRequest {
            id: done.last_insert_rowid(),
            name: input.name,
            contact: input.contact,
            license_plate,
            start_date: input.start_date,
            end_date: input.end_date,
            notes: input.notes,
            status: RequestStatus::Pending,
            created_at: now,
        };
        insert_activity(&mut *tx, &NewActivity::request_created(&request)).await?;
        tx.commit().await?;
        Ok(request)
    }

    async fn update_rental_request_status(
        &self,
        id: i64,
        status: RequestStatus,
    ) -> StorageResult<Option<RentalRequest>> {
        let mut tx = self.begin_write().await?;
        let Some(mut request) = fetch_request(&mut *tx, id).await? else {
            return Ok(None);
        };

        sqlx::query("UPDATE rental_requests SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let previous = request.status;
        request.status = status;
        insert_activity(
            &mut *tx,
            &NewActivity::request_status_updated(&request, previous),
        )
        .await?;
        tx.commit().await?;
        Ok(Some(request))
    }

    async fn list_parking_offers(&self, request_id: i64) -> StorageResult<Vec<ParkingOffer>> {
        let rows = sqlx::query("SELECT * FROM parking_offers WHERE request_id = ? ORDER BY id")
            .bind(request_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_offer).collect()
    }

    async fn create_parking_offer(
        &self,
        request_id: i64,
        input: ParkingOfferCreateInput,
    ) -> StorageResult<ParkingOffer> {
        let mut tx = self.begin_write().await?;
        let Some(mut request) = fetch_request(&mut *tx, request_id).await? else {
            return Err(StorageError::NotFound("Parking request".to_string()));
        };
        rules::ensure_request_accepts_offers(&request)?;

        // Only the first offer moves the request out of PENDING
        let matched = sqlx::query(
            "UPDATE rental_requests SET status = 'MATCHED' WHERE id = ? AND status = 'PENDING'",
        )
        .bind(request_id)
        .execute(&mut *tx)
        .await?;
        if matched.rows_affected() == 0 {
            return Err(rules::request_closed(request_id));
        }
        request.status = RequestStatus::Matched;

        let now: DateTime<Utc> = Utc::now();
        let space_number = input.space_number.trim().to_string();
        let done = sqlx::query(
            r#"
            INSERT INTO parking_offers (
                request_id, space_number, owner_name, owner_contact, notes, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request_id)
        .bind(&space_number)
        .bind(&input.owner_name)
        .bind(&input.owner_contact)
        .bind(&input.notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let offer = ParkingOffer {
            id: done.last_insert_rowid(),
            request_id,
            space_number,
            owner_name: input.owner_name,
            owner_contact: input.owner_contact,
            notes: input.notes,
            created_at: now,
        };
        insert_activity(&mut *tx, &NewActivity::offer_created(&offer, &request)).await?;
        tx.commit().await?;

        info!("Parking request {} matched by offer {}", request_id, offer.id);
        Ok(offer)
    }
}
