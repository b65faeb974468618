//! Miscellaneous inventory
//!
//! Batteries, chargers and accessories handed out with rentals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "inventory_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryType {
    Battery,
    Charger,
    Accessory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "stock_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    InStock,
    Assigned,
    Damaged,
    Retired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct InventoryItem {
    pub id: Uuid,
    pub item_type: InventoryType,
    pub serial_number: String,
    pub stock_status: StockStatus,
    pub assigned_rental_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInventoryRequest {
    pub item_type: InventoryType,

    #[validate(length(min = 1, max = 64))]
    pub serial_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignInventoryRequest {
    pub rental_id: Uuid,
}

impl InventoryItem {
    pub fn from_request(request: CreateInventoryRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_type: request.item_type,
            serial_number: request.serial_number.trim().to_string(),
            stock_status: StockStatus::InStock,
            assigned_rental_id: None,
            created_at: Utc::now(),
        }
    }
}
