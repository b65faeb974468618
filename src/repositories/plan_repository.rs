use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::plan::Plan;
use crate::repositories::PlanRepository;
use crate::utils::errors::{not_found_error, AppError, AppResult};

const PLAN_COLUMNS: &str =
    "id, name, joining_fee, security_deposit, required_documents, created_at";

pub struct PgPlanRepository {
    pool: PgPool,
}

impl PgPlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanRepository for PgPlanRepository {
    async fn list(&self) -> AppResult<Vec<Plan>> {
        let plans = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {} FROM plans ORDER BY name",
            PLAN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(plans)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Plan>> {
        let plan = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {} FROM plans WHERE id = $1",
            PLAN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(plan)
    }

    async fn create(&self, plan: Plan) -> AppResult<Plan> {
        let plan = sqlx::query_as::<_, Plan>(&format!(
            r#"
            INSERT INTO plans (id, name, joining_fee, security_deposit, required_documents, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            PLAN_COLUMNS
        ))
        .bind(plan.id)
        .bind(&plan.name)
        .bind(plan.joining_fee)
        .bind(plan.security_deposit)
        .bind(&plan.required_documents)
        .bind(plan.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(plan)
    }

    async fn update(&self, plan: Plan) -> AppResult<Plan> {
        sqlx::query_as::<_, Plan>(&format!(
            r#"
            UPDATE plans
            SET name = $2, joining_fee = $3, security_deposit = $4, required_documents = $5
            WHERE id = $1
            RETURNING {}
            "#,
            PLAN_COLUMNS
        ))
        .bind(plan.id)
        .bind(&plan.name)
        .bind(plan.joining_fee)
        .bind(plan.security_deposit)
        .bind(&plan.required_documents)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found_error("Plan", plan.id))
    }

    async fn delete_if_unreferenced(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let referenced: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(SELECT 1 FROM rentals WHERE plan_id = $1)
                OR EXISTS(SELECT 1 FROM vehicles WHERE plan_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if referenced.0 {
            return Err(AppError::Conflict(format!(
                "Plan {} is still referenced by vehicles or rentals",
                id
            )));
        }

        let deleted = sqlx::query("DELETE FROM plans WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(not_found_error("Plan", id));
        }

        tx.commit().await?;
        Ok(())
    }
}
