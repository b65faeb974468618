//! Plans and vehicles
//!
//! Public browsing plus the admin edits. Availability is derived from the
//! active-rental count, never stored.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::models::plan::{Plan, PlanRequest};
use crate::models::vehicle::{
    CreateVehicleRequest, UpdateVehicleRequest, Vehicle, VehicleAvailability,
};
use crate::repositories::{PlanRepository, VehicleRepository};
use crate::utils::errors::{not_found_error, AppResult};
use crate::utils::validation::ensure_date_range;

pub struct CatalogService {
    plans: Arc<dyn PlanRepository>,
    vehicles: Arc<dyn VehicleRepository>,
}

impl CatalogService {
    pub fn new(plans: Arc<dyn PlanRepository>, vehicles: Arc<dyn VehicleRepository>) -> Self {
        Self { plans, vehicles }
    }

    pub async fn list_plans(&self) -> AppResult<Vec<Plan>> {
        self.plans.list().await
    }

    pub async fn create_plan(&self, request: PlanRequest) -> AppResult<Plan> {
        request.validate()?;
        let plan = self.plans.create(Plan::from_request(request)).await?;
        info!(plan_id = %plan.id, "📋 Plan created: {}", plan.name);
        Ok(plan)
    }

    pub async fn update_plan(&self, id: Uuid, request: PlanRequest) -> AppResult<Plan> {
        request.validate()?;
        let current = self
            .plans
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Plan", id))?;

        self.plans
            .update(Plan {
                id: current.id,
                created_at: current.created_at,
                ..Plan::from_request(request)
            })
            .await
    }

    pub async fn delete_plan(&self, id: Uuid) -> AppResult<()> {
        self.plans.delete_if_unreferenced(id).await?;
        info!(plan_id = %id, "🗑️ Plan deleted");
        Ok(())
    }

    pub async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>> {
        self.vehicles.list().await
    }

    pub async fn get_vehicle(&self, id: Uuid) -> AppResult<Vehicle> {
        self.vehicles
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", id))
    }

    pub async fn create_vehicle(&self, request: CreateVehicleRequest) -> AppResult<Vehicle> {
        request.validate()?;
        if let Some(plan_id) = request.plan_id {
            self.ensure_plan(plan_id).await?;
        }
        let vehicle = self.vehicles.create(Vehicle::from_request(request)).await?;
        info!(vehicle_id = %vehicle.id, "🛵 Vehicle created: {}", vehicle.model);
        Ok(vehicle)
    }

    pub async fn update_vehicle(
        &self,
        id: Uuid,
        request: UpdateVehicleRequest,
    ) -> AppResult<Vehicle> {
        request.validate()?;
        if let Some(plan_id) = request.plan_id {
            self.ensure_plan(plan_id).await?;
        }
        let current = self.get_vehicle(id).await?;
        self.vehicles.update(current.apply_update(request)).await
    }

    /// Units free for the whole range; a missing range means today
    pub async fn availability(
        &self,
        id: Uuid,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AppResult<VehicleAvailability> {
        let start = start.unwrap_or_else(|| Utc::now().date_naive());
        let end = end.unwrap_or(start);
        ensure_date_range(start, end)?;

        let vehicle = self.get_vehicle(id).await?;
        let booked = self.vehicles.count_active_overlapping(id, start, end).await?;

        Ok(VehicleAvailability {
            available_units: (i64::from(vehicle.quantity) - booked).max(0),
            vehicle,
        })
    }

    async fn ensure_plan(&self, plan_id: Uuid) -> AppResult<()> {
        self.plans
            .find_by_id(plan_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| not_found_error("Plan", plan_id))
    }
}
