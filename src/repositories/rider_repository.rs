use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::rider::{Rider, RiderKyc};
use crate::repositories::RiderRepository;
use crate::utils::errors::{map_unique_violation, not_found_error, AppResult};

const RIDER_COLUMNS: &str =
    "id, name, phone, email, password_hash, is_active, created_at, last_login_at";

pub struct PgRiderRepository {
    pool: PgPool,
}

impl PgRiderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RiderRepository for PgRiderRepository {
    async fn create(&self, rider: Rider) -> AppResult<Rider> {
        let contact = format!("{} / {}", rider.phone, rider.email);
        sqlx::query_as::<_, Rider>(&format!(
            r#"
            INSERT INTO riders (id, name, phone, email, password_hash, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            RIDER_COLUMNS
        ))
        .bind(rider.id)
        .bind(&rider.name)
        .bind(&rider.phone)
        .bind(&rider.email)
        .bind(&rider.password_hash)
        .bind(rider.is_active)
        .bind(rider.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Rider", "phone or email", &contact))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Rider>> {
        let rider = sqlx::query_as::<_, Rider>(&format!(
            "SELECT {} FROM riders WHERE id = $1",
            RIDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rider)
    }

    async fn find_by_login(&self, identifier: &str) -> AppResult<Option<Rider>> {
        let rider = sqlx::query_as::<_, Rider>(&format!(
            "SELECT {} FROM riders WHERE phone = $1 OR lower(email) = lower($1) LIMIT 1",
            RIDER_COLUMNS
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rider)
    }

    async fn list(&self) -> AppResult<Vec<Rider>> {
        let riders = sqlx::query_as::<_, Rider>(&format!(
            "SELECT {} FROM riders ORDER BY created_at DESC",
            RIDER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(riders)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        email: Option<String>,
    ) -> AppResult<Rider> {
        let email_label = email.clone().unwrap_or_default();
        sqlx::query_as::<_, Rider>(&format!(
            r#"
            UPDATE riders
            SET name = COALESCE($2, name), email = COALESCE($3, email)
            WHERE id = $1
            RETURNING {}
            "#,
            RIDER_COLUMNS
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Rider", "email", &email_label))?
        .ok_or_else(|| not_found_error("Rider", id))
    }

    async fn set_password_if_unset(&self, id: Uuid, password_hash: String) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE riders SET password_hash = $2 WHERE id = $1 AND password_hash IS NULL",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<Rider> {
        sqlx::query_as::<_, Rider>(&format!(
            "UPDATE riders SET is_active = $2 WHERE id = $1 RETURNING {}",
            RIDER_COLUMNS
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found_error("Rider", id))
    }

    async fn record_last_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE riders SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn upsert_kyc(&self, kyc: RiderKyc) -> AppResult<RiderKyc> {
        let kyc = sqlx::query_as::<_, RiderKyc>(
            r#"
            INSERT INTO rider_kyc (
                rider_id, aadhaar_number, pan_number, dl_number,
                aadhaar_image_url, pan_image_url, dl_image_url, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (rider_id) DO UPDATE SET
                aadhaar_number = COALESCE(EXCLUDED.aadhaar_number, rider_kyc.aadhaar_number),
                pan_number = COALESCE(EXCLUDED.pan_number, rider_kyc.pan_number),
                dl_number = COALESCE(EXCLUDED.dl_number, rider_kyc.dl_number),
                aadhaar_image_url = COALESCE(EXCLUDED.aadhaar_image_url, rider_kyc.aadhaar_image_url),
                pan_image_url = COALESCE(EXCLUDED.pan_image_url, rider_kyc.pan_image_url),
                dl_image_url = COALESCE(EXCLUDED.dl_image_url, rider_kyc.dl_image_url),
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(kyc.rider_id)
        .bind(&kyc.aadhaar_number)
        .bind(&kyc.pan_number)
        .bind(&kyc.dl_number)
        .bind(&kyc.aadhaar_image_url)
        .bind(&kyc.pan_image_url)
        .bind(&kyc.dl_image_url)
        .bind(kyc.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(kyc)
    }

    async fn find_kyc(&self, rider_id: Uuid) -> AppResult<Option<RiderKyc>> {
        let kyc = sqlx::query_as::<_, RiderKyc>("SELECT * FROM rider_kyc WHERE rider_id = $1")
            .bind(rider_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(kyc)
    }
}
