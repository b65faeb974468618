use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::rental::RentalStatus;
use crate::models::vehicle::Vehicle;
use crate::repositories::VehicleRepository;
use crate::utils::errors::{not_found_error, AppResult};

const VEHICLE_COLUMNS: &str = "id, model, rent_per_day, image_urls, quantity, plan_id, created_at";

/// Statuses that hold a vehicle unit, as bound into SQL
pub(crate) fn active_statuses() -> Vec<RentalStatus> {
    RentalStatus::ALL
        .into_iter()
        .filter(RentalStatus::is_active)
        .collect()
}

pub struct PgVehicleRepository {
    pool: PgPool,
}

impl PgVehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VehicleRepository for PgVehicleRepository {
    async fn list(&self) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(&format!(
            "SELECT {} FROM vehicles ORDER BY model",
            VEHICLE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(vehicles)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>(&format!(
            "SELECT {} FROM vehicles WHERE id = $1",
            VEHICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vehicle)
    }

    async fn create(&self, vehicle: Vehicle) -> AppResult<Vehicle> {
        let vehicle = sqlx::query_as::<_, Vehicle>(&format!(
            r#"
            INSERT INTO vehicles (id, model, rent_per_day, image_urls, quantity, plan_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            VEHICLE_COLUMNS
        ))
        .bind(vehicle.id)
        .bind(&vehicle.model)
        .bind(vehicle.rent_per_day)
        .bind(&vehicle.image_urls)
        .bind(vehicle.quantity)
        .bind(vehicle.plan_id)
        .bind(vehicle.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(vehicle)
    }

    async fn update(&self, vehicle: Vehicle) -> AppResult<Vehicle> {
        sqlx::query_as::<_, Vehicle>(&format!(
            r#"
            UPDATE vehicles
            SET model = $2, rent_per_day = $3, image_urls = $4, quantity = $5, plan_id = $6
            WHERE id = $1
            RETURNING {}
            "#,
            VEHICLE_COLUMNS
        ))
        .bind(vehicle.id)
        .bind(&vehicle.model)
        .bind(vehicle.rent_per_day)
        .bind(&vehicle.image_urls)
        .bind(vehicle.quantity)
        .bind(vehicle.plan_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found_error("Vehicle", vehicle.id))
    }

    async fn count_active_overlapping(
        &self,
        vehicle_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM rentals
            WHERE vehicle_id = $1
              AND status = ANY($2)
              AND start_date <= $4
              AND expected_return_date >= $3
            "#,
        )
        .bind(vehicle_id)
        .bind(active_statuses())
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }
}
