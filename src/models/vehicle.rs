//! Vehicle model
//!
//! A rentable vehicle model with its daily rate and fleet size. Maps to the
//! `vehicles` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::utils::validation::validate_non_negative_amount;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub model: String,
    pub rent_per_day: Decimal,
    pub image_urls: Vec<String>,
    /// Fleet units of this model; availability is this minus active rentals
    pub quantity: i32,
    pub plan_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Request to create a vehicle
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(length(min = 2, max = 100))]
    pub model: String,

    #[validate(custom = "validate_non_negative_amount")]
    pub rent_per_day: Decimal,

    #[serde(default)]
    pub image_urls: Vec<String>,

    #[validate(range(min = 0, max = 10000))]
    pub quantity: i32,

    pub plan_id: Option<Uuid>,
}

/// Request to update a vehicle; absent fields are kept
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateVehicleRequest {
    #[validate(length(min = 2, max = 100))]
    pub model: Option<String>,

    #[validate(custom = "validate_non_negative_amount")]
    pub rent_per_day: Option<Decimal>,

    pub image_urls: Option<Vec<String>>,

    #[validate(range(min = 0, max = 10000))]
    pub quantity: Option<i32>,

    pub plan_id: Option<Uuid>,
}

/// Vehicle with live availability for a date range
#[derive(Debug, Clone, Serialize)]
pub struct VehicleAvailability {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub available_units: i64,
}

impl Vehicle {
    pub fn from_request(request: CreateVehicleRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            model: request.model,
            rent_per_day: request.rent_per_day,
            image_urls: request.image_urls,
            quantity: request.quantity,
            plan_id: request.plan_id,
            created_at: Utc::now(),
        }
    }

    pub fn apply_update(mut self, request: UpdateVehicleRequest) -> Self {
        if let Some(model) = request.model {
            self.model = model;
        }
        if let Some(rate) = request.rent_per_day {
            self.rent_per_day = rate;
        }
        if let Some(urls) = request.image_urls {
            self.image_urls = urls;
        }
        if let Some(quantity) = request.quantity {
            self.quantity = quantity;
        }
        if request.plan_id.is_some() {
            self.plan_id = request.plan_id;
        }
        self
    }
}
