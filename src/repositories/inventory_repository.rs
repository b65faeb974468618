use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::inventory::{InventoryItem, StockStatus};
use crate::repositories::InventoryRepository;
use crate::utils::errors::{map_unique_violation, not_found_error, AppError, AppResult};

const ITEM_COLUMNS: &str =
    "id, item_type, serial_number, stock_status, assigned_rental_id, created_at";

pub struct PgInventoryRepository {
    pool: PgPool,
}

impl PgInventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {} FROM misc_inventory WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }
}

#[async_trait]
impl InventoryRepository for PgInventoryRepository {
    async fn create(&self, item: InventoryItem) -> AppResult<InventoryItem> {
        let serial = item.serial_number.clone();
        sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            INSERT INTO misc_inventory (id, item_type, serial_number, stock_status, assigned_rental_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(item.id)
        .bind(item.item_type)
        .bind(&item.serial_number)
        .bind(item.stock_status)
        .bind(item.assigned_rental_id)
        .bind(item.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Inventory item", "serial_number", &serial))
    }

    async fn list(&self) -> AppResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {} FROM misc_inventory ORDER BY item_type, serial_number",
            ITEM_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn assign(&self, id: Uuid, rental_id: Uuid) -> AppResult<InventoryItem> {
        let assigned = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            UPDATE misc_inventory
            SET stock_status = $3, assigned_rental_id = $2
            WHERE id = $1 AND stock_status = $4
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(id)
        .bind(rental_id)
        .bind(StockStatus::Assigned)
        .bind(StockStatus::InStock)
        .fetch_optional(&self.pool)
        .await?;

        match assigned {
            Some(item) => Ok(item),
            None => match self.find_by_id(id).await? {
                Some(item) => Err(AppError::Conflict(format!(
                    "Inventory item {} is not in stock ({:?})",
                    item.serial_number, item.stock_status
                ))),
                None => Err(not_found_error("Inventory item", id)),
            },
        }
    }

    async fn release(&self, id: Uuid) -> AppResult<InventoryItem> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            UPDATE misc_inventory
            SET stock_status = $2, assigned_rental_id = NULL
            WHERE id = $1
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(id)
        .bind(StockStatus::InStock)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found_error("Inventory item", id))
    }

    async fn release_for_rental(&self, rental_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE misc_inventory
            SET stock_status = $2, assigned_rental_id = NULL
            WHERE assigned_rental_id = $1
            "#,
        )
        .bind(rental_id)
        .bind(StockStatus::InStock)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
