use std::sync::Arc;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::models::inventory::{AssignInventoryRequest, CreateInventoryRequest, InventoryItem};
use crate::repositories::{InventoryRepository, RentalRepository};
use crate::utils::errors::{not_found_error, AppError, AppResult};

/// Batteries, chargers and accessories handed out with rentals
pub struct InventoryService {
    inventory: Arc<dyn InventoryRepository>,
    rentals: Arc<dyn RentalRepository>,
}

impl InventoryService {
    pub fn new(inventory: Arc<dyn InventoryRepository>, rentals: Arc<dyn RentalRepository>) -> Self {
        Self { inventory, rentals }
    }

    pub async fn create(&self, request: CreateInventoryRequest) -> AppResult<InventoryItem> {
        request.validate()?;
        self.inventory.create(InventoryItem::from_request(request)).await
    }

    pub async fn list(&self) -> AppResult<Vec<InventoryItem>> {
        self.inventory.list().await
    }

    /// Only rentals still holding a vehicle can take items
    pub async fn assign(&self, id: Uuid, request: AssignInventoryRequest) -> AppResult<InventoryItem> {
        let rental = self
            .rentals
            .find_by_id(request.rental_id)
            .await?
            .ok_or_else(|| not_found_error("Rental", request.rental_id))?;
        if !rental.status.is_active() {
            return Err(AppError::Conflict(format!(
                "Rental {} is {}",
                rental.id, rental.status
            )));
        }

        let item = self.inventory.assign(id, rental.id).await?;
        info!(item_id = %id, rental_id = %rental.id, "🔋 Inventory assigned: {}", item.serial_number);
        Ok(item)
    }

    pub async fn release(&self, id: Uuid) -> AppResult<InventoryItem> {
        self.inventory.release(id).await
    }
}
