//! PostgreSQL rentals
//!
//! Capacity is enforced under a `FOR UPDATE` lock on the vehicle row, so two
//! bookings racing for the last unit serialize on it and the second one sees
//! the first one's insert.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::rental::{PricingSnapshot, Rental, RentalStatus};
use crate::repositories::vehicle_repository::active_statuses;
use crate::repositories::{RentalMutation, RentalRepository};
use crate::utils::errors::{not_found_error, AppError, AppResult};

const RENTAL_COLUMNS: &str = "id, rider_id, vehicle_id, plan_id, status, start_date, \
     expected_return_date, actual_return_date, rate_per_day, payable_total, paid_total, \
     pricing, created_at, updated_at";

#[derive(Debug, FromRow)]
struct RentalRow {
    id: Uuid,
    rider_id: Uuid,
    vehicle_id: Uuid,
    plan_id: Uuid,
    status: RentalStatus,
    start_date: NaiveDate,
    expected_return_date: NaiveDate,
    actual_return_date: Option<NaiveDate>,
    rate_per_day: Decimal,
    payable_total: Decimal,
    paid_total: Decimal,
    pricing: Json<PricingSnapshot>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RentalRow> for Rental {
    fn from(row: RentalRow) -> Self {
        Self {
            id: row.id,
            rider_id: row.rider_id,
            vehicle_id: row.vehicle_id,
            plan_id: row.plan_id,
            status: row.status,
            start_date: row.start_date,
            expected_return_date: row.expected_return_date,
            actual_return_date: row.actual_return_date,
            rate_per_day: row.rate_per_day,
            payable_total: row.payable_total,
            paid_total: row.paid_total,
            pricing: row.pricing.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct PgRentalRepository {
    pool: PgPool,
}

impl PgRentalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_many(&self, sql: &str, rider: Option<Uuid>) -> AppResult<Vec<Rental>> {
        let mut query = sqlx::query_as::<_, RentalRow>(sql);
        if let Some(rider_id) = rider {
            query = query.bind(rider_id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Rental::from).collect())
    }
}

/// Lock the vehicle and fail unless a unit is free over `[start, end]`,
/// not counting `exclude` itself
async fn ensure_capacity(
    tx: &mut Transaction<'_, Postgres>,
    vehicle_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    let quantity: Option<(i32,)> =
        sqlx::query_as("SELECT quantity FROM vehicles WHERE id = $1 FOR UPDATE")
            .bind(vehicle_id)
            .fetch_optional(&mut **tx)
            .await?;
    let (quantity,) = quantity.ok_or_else(|| not_found_error("Vehicle", vehicle_id))?;

    let (overlapping,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM rentals
        WHERE vehicle_id = $1
          AND status = ANY($2)
          AND start_date <= $4
          AND expected_return_date >= $3
          AND ($5::uuid IS NULL OR id <> $5)
        "#,
    )
    .bind(vehicle_id)
    .bind(active_statuses())
    .bind(start)
    .bind(end)
    .bind(exclude)
    .fetch_one(&mut **tx)
    .await?;

    if overlapping >= i64::from(quantity) {
        tracing::info!(
            vehicle_id = %vehicle_id,
            overlapping,
            quantity,
            "🚫 No units free for {} .. {}",
            start,
            end
        );
        return Err(AppError::Conflict(format!(
            "Vehicle {} is not available from {} to {}",
            vehicle_id, start, end
        )));
    }

    Ok(())
}

#[async_trait]
impl RentalRepository for PgRentalRepository {
    async fn insert_if_available(&self, rental: Rental) -> AppResult<Rental> {
        let mut tx = self.pool.begin().await?;

        ensure_capacity(
            &mut tx,
            rental.vehicle_id,
            rental.start_date,
            rental.expected_return_date,
            None,
        )
        .await?;

        let row = sqlx::query_as::<_, RentalRow>(&format!(
            r#"
            INSERT INTO rentals (
                id, rider_id, vehicle_id, plan_id, status, start_date, expected_return_date,
                actual_return_date, rate_per_day, payable_total, paid_total, pricing,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {}
            "#,
            RENTAL_COLUMNS
        ))
        .bind(rental.id)
        .bind(rental.rider_id)
        .bind(rental.vehicle_id)
        .bind(rental.plan_id)
        .bind(rental.status)
        .bind(rental.start_date)
        .bind(rental.expected_return_date)
        .bind(rental.actual_return_date)
        .bind(rental.rate_per_day)
        .bind(rental.payable_total)
        .bind(rental.paid_total)
        .bind(Json(&rental.pricing))
        .bind(rental.created_at)
        .bind(rental.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Rental>> {
        let row = sqlx::query_as::<_, RentalRow>(&format!(
            "SELECT {} FROM rentals WHERE id = $1",
            RENTAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Rental::from))
    }

    async fn list_by_rider(&self, rider_id: Uuid) -> AppResult<Vec<Rental>> {
        let sql = format!(
            "SELECT {} FROM rentals WHERE rider_id = $1 ORDER BY created_at DESC",
            RENTAL_COLUMNS
        );
        self.fetch_many(&sql, Some(rider_id)).await
    }

    async fn list(&self, status: Option<RentalStatus>) -> AppResult<Vec<Rental>> {
        let rows = sqlx::query_as::<_, RentalRow>(&format!(
            r#"
            SELECT {} FROM rentals
            WHERE $1::rental_status IS NULL OR status = $1
            ORDER BY created_at DESC
            "#,
            RENTAL_COLUMNS
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Rental::from).collect())
    }

    async fn list_alert_candidates(&self) -> AppResult<Vec<Rental>> {
        let sql = format!(
            r#"
            SELECT {} FROM rentals
            WHERE status IN ('BOOKED', 'CONFIRMED', 'ONGOING', 'OVERDUE')
              AND actual_return_date IS NULL
            ORDER BY expected_return_date
            "#,
            RENTAL_COLUMNS
        );
        self.fetch_many(&sql, None).await
    }

    async fn update_atomically(
        &self,
        id: Uuid,
        owner: Option<Uuid>,
        mutation: RentalMutation<'_>,
    ) -> AppResult<Rental> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, RentalRow>(&format!(
            r#"
            SELECT {} FROM rentals
            WHERE id = $1 AND ($2::uuid IS NULL OR rider_id = $2)
            FOR UPDATE
            "#,
            RENTAL_COLUMNS
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found_error("Rental", id))?;

        let before = Rental::from(row);
        let after = mutation(before.clone())?;

        let dates_moved = after.start_date != before.start_date
            || after.expected_return_date != before.expected_return_date;
        let reactivated = after.status.is_active() && !before.status.is_active();
        if after.status.is_active() && (dates_moved || reactivated) {
            ensure_capacity(
                &mut tx,
                after.vehicle_id,
                after.start_date,
                after.expected_return_date,
                Some(after.id),
            )
            .await?;
        }

        let row = sqlx::query_as::<_, RentalRow>(&format!(
            r#"
            UPDATE rentals
            SET status = $2, start_date = $3, expected_return_date = $4,
                actual_return_date = $5, payable_total = $6, paid_total = $7,
                pricing = $8, updated_at = $9
            WHERE id = $1
            RETURNING {}
            "#,
            RENTAL_COLUMNS
        ))
        .bind(after.id)
        .bind(after.status)
        .bind(after.start_date)
        .bind(after.expected_return_date)
        .bind(after.actual_return_date)
        .bind(after.payable_total)
        .bind(after.paid_total)
        .bind(Json(&after.pricing))
        .bind(after.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }
}
