//! Persistence gateway
//!
//! One trait per aggregate. Production implementations run parameterized
//! SQL against PostgreSQL; `in_memory` backs the tests. Operations that
//! read-modify-write more than one derived value are single trait methods
//! so each implementation can make them atomic.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{
    inventory::InventoryItem,
    payment::{Payment, PaymentOrder, ReconcileOutcome},
    plan::Plan,
    rental::{Rental, RentalStatus},
    rider::{Rider, RiderKyc},
    vehicle::Vehicle,
};
use crate::utils::errors::AppResult;

pub mod in_memory;
pub mod inventory_repository;
pub mod payment_repository;
pub mod plan_repository;
pub mod rental_repository;
pub mod rider_repository;
pub mod vehicle_repository;

pub use in_memory::InMemoryStore;
pub use inventory_repository::PgInventoryRepository;
pub use payment_repository::PgPaymentRepository;
pub use plan_repository::PgPlanRepository;
pub use rental_repository::PgRentalRepository;
pub use rider_repository::PgRiderRepository;
pub use vehicle_repository::PgVehicleRepository;

/// Pure change applied to a locked rental row. Returning an error aborts the
/// whole operation and leaves the row untouched.
pub type RentalMutation<'a> = &'a (dyn Fn(Rental) -> AppResult<Rental> + Send + Sync);

#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Plan>>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Plan>>;
    async fn create(&self, plan: Plan) -> AppResult<Plan>;
    async fn update(&self, plan: Plan) -> AppResult<Plan>;
    /// Fails with a conflict while any rental references the plan
    async fn delete_if_unreferenced(&self, id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Vehicle>>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Vehicle>>;
    async fn create(&self, vehicle: Vehicle) -> AppResult<Vehicle>;
    async fn update(&self, vehicle: Vehicle) -> AppResult<Vehicle>;
    /// Active rentals on the vehicle overlapping `[start, end]`
    async fn count_active_overlapping(
        &self,
        vehicle_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<i64>;
}

#[async_trait]
pub trait RiderRepository: Send + Sync {
    /// Conflict when phone or email is taken
    async fn create(&self, rider: Rider) -> AppResult<Rider>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Rider>>;
    /// Lookup by phone or email
    async fn find_by_login(&self, identifier: &str) -> AppResult<Option<Rider>>;
    async fn list(&self) -> AppResult<Vec<Rider>>;
    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        email: Option<String>,
    ) -> AppResult<Rider>;
    /// Returns false when a password was already set
    async fn set_password_if_unset(&self, id: Uuid, password_hash: String) -> AppResult<bool>;
    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<Rider>;
    async fn record_last_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;
    async fn upsert_kyc(&self, kyc: RiderKyc) -> AppResult<RiderKyc>;
    async fn find_kyc(&self, rider_id: Uuid) -> AppResult<Option<RiderKyc>>;
}

#[async_trait]
pub trait RentalRepository: Send + Sync {
    /// Insert while holding the vehicle's lock; conflict when every unit is
    /// already claimed for an overlapping range
    async fn insert_if_available(&self, rental: Rental) -> AppResult<Rental>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Rental>>;
    async fn list_by_rider(&self, rider_id: Uuid) -> AppResult<Vec<Rental>>;
    async fn list(&self, status: Option<RentalStatus>) -> AppResult<Vec<Rental>>;
    /// Rentals the alert scanner has to look at
    async fn list_alert_candidates(&self) -> AppResult<Vec<Rental>>;
    /// Lock the row (scoped to `owner` when given), apply `mutation`, re-check
    /// vehicle capacity if the dates moved, write back. All or nothing.
    async fn update_atomically(
        &self,
        id: Uuid,
        owner: Option<Uuid>,
        mutation: RentalMutation<'_>,
    ) -> AppResult<Rental>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create_order(&self, order: PaymentOrder) -> AppResult<PaymentOrder>;
    async fn find_order(&self, order_id: &str) -> AppResult<Option<PaymentOrder>>;
    /// Idempotent on `gateway_reference`; credits the order's rental at most
    /// once and confirms a booked rental in the same transaction
    async fn record_gateway_payment(&self, payment: Payment) -> AppResult<ReconcileOutcome>;
    async fn list_by_rider(&self, rider_id: Uuid) -> AppResult<Vec<Payment>>;
}

#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn create(&self, item: InventoryItem) -> AppResult<InventoryItem>;
    async fn list(&self) -> AppResult<Vec<InventoryItem>>;
    /// Conflict unless the item is in stock
    async fn assign(&self, id: Uuid, rental_id: Uuid) -> AppResult<InventoryItem>;
    async fn release(&self, id: Uuid) -> AppResult<InventoryItem>;
    /// Put everything assigned to the rental back in stock
    async fn release_for_rental(&self, rental_id: Uuid) -> AppResult<u64>;
}
