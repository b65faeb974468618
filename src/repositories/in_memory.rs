//! In-memory persistence
//!
//! Every table lives behind one `RwLock`, so each trait method runs as a
//! single critical section and gives the same all-or-nothing behaviour the
//! PostgreSQL implementations get from transactions. Used by the test suite
//! and by `AppState::in_memory`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    inventory::{InventoryItem, StockStatus},
    payment::{Payment, PaymentOrder, PaymentStatus, ReconcileOutcome},
    plan::Plan,
    rental::{Rental, RentalStatus},
    rider::{Rider, RiderKyc},
    vehicle::Vehicle,
};
use crate::repositories::{
    InventoryRepository, PaymentRepository, PlanRepository, RentalMutation, RentalRepository,
    RiderRepository, VehicleRepository,
};
use crate::utils::errors::{conflict_error, not_found_error, AppError, AppResult};

#[derive(Default)]
struct Tables {
    plans: HashMap<Uuid, Plan>,
    vehicles: HashMap<Uuid, Vehicle>,
    riders: HashMap<Uuid, Rider>,
    kyc: HashMap<Uuid, RiderKyc>,
    rentals: HashMap<Uuid, Rental>,
    orders: HashMap<String, PaymentOrder>,
    /// Keyed by gateway reference
    payments: HashMap<String, Payment>,
    inventory: HashMap<Uuid, InventoryItem>,
}

impl Tables {
    fn count_active_overlapping(
        &self,
        vehicle_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<Uuid>,
    ) -> i64 {
        self.rentals
            .values()
            .filter(|r| r.vehicle_id == vehicle_id)
            .filter(|r| Some(r.id) != exclude)
            .filter(|r| r.status.is_active())
            .filter(|r| r.overlaps(start, end))
            .count() as i64
    }

    fn ensure_capacity(
        &self,
        vehicle_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<Uuid>,
    ) -> AppResult<()> {
        let vehicle = self
            .vehicles
            .get(&vehicle_id)
            .ok_or_else(|| not_found_error("Vehicle", vehicle_id))?;

        if self.count_active_overlapping(vehicle_id, start, end, exclude)
            >= i64::from(vehicle.quantity)
        {
            return Err(AppError::Conflict(format!(
                "Vehicle {} is not available from {} to {}",
                vehicle_id, start, end
            )));
        }
        Ok(())
    }

    fn login_taken(&self, phone: &str, email: &str, except: Option<Uuid>) -> bool {
        self.riders.values().any(|r| {
            Some(r.id) != except && (r.phone == phone || r.email.eq_ignore_ascii_case(email))
        })
    }

    fn credit(&mut self, payment: &Payment) -> bool {
        if let Some(order) = self.orders.get_mut(&payment.order_id) {
            order.status = PaymentStatus::Success;
        }

        let Some(rental) = payment.rental_id.and_then(|id| self.rentals.get_mut(&id)) else {
            return false;
        };
        rental.paid_total += payment.amount;
        if rental.status == RentalStatus::Booked {
            rental.status = RentalStatus::Confirmed;
        }
        rental.updated_at = Utc::now();
        true
    }
}

/// All repositories over shared in-process tables
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(key);
    items
}

#[async_trait]
impl PlanRepository for InMemoryStore {
    async fn list(&self) -> AppResult<Vec<Plan>> {
        let tables = self.tables.read().await;
        Ok(sorted(tables.plans.values().cloned().collect(), |p| p.name.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Plan>> {
        Ok(self.tables.read().await.plans.get(&id).cloned())
    }

    async fn create(&self, plan: Plan) -> AppResult<Plan> {
        self.tables.write().await.plans.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn update(&self, plan: Plan) -> AppResult<Plan> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .plans
            .get_mut(&plan.id)
            .ok_or_else(|| not_found_error("Plan", plan.id))?;
        stored.name = plan.name;
        stored.joining_fee = plan.joining_fee;
        stored.security_deposit = plan.security_deposit;
        stored.required_documents = plan.required_documents;
        Ok(stored.clone())
    }

    async fn delete_if_unreferenced(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let referenced = tables.rentals.values().any(|r| r.plan_id == id)
            || tables.vehicles.values().any(|v| v.plan_id == Some(id));
        if referenced {
            return Err(AppError::Conflict(format!(
                "Plan {} is still referenced by vehicles or rentals",
                id
            )));
        }
        tables
            .plans
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found_error("Plan", id))
    }
}

#[async_trait]
impl VehicleRepository for InMemoryStore {
    async fn list(&self) -> AppResult<Vec<Vehicle>> {
        let tables = self.tables.read().await;
        Ok(sorted(tables.vehicles.values().cloned().collect(), |v| v.model.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        Ok(self.tables.read().await.vehicles.get(&id).cloned())
    }

    async fn create(&self, vehicle: Vehicle) -> AppResult<Vehicle> {
        self.tables
            .write()
            .await
            .vehicles
            .insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    async fn update(&self, vehicle: Vehicle) -> AppResult<Vehicle> {
        let mut tables = self.tables.write().await;
        if !tables.vehicles.contains_key(&vehicle.id) {
            return Err(not_found_error("Vehicle", vehicle.id));
        }
        tables.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    async fn count_active_overlapping(
        &self,
        vehicle_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.count_active_overlapping(vehicle_id, start, end, None))
    }
}

#[async_trait]
impl RiderRepository for InMemoryStore {
    async fn create(&self, rider: Rider) -> AppResult<Rider> {
        let mut tables = self.tables.write().await;
        if tables.login_taken(&rider.phone, &rider.email, None) {
            return Err(conflict_error(
                "Rider",
                "phone or email",
                &format!("{} / {}", rider.phone, rider.email),
            ));
        }
        tables.riders.insert(rider.id, rider.clone());
        Ok(rider)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Rider>> {
        Ok(self.tables.read().await.riders.get(&id).cloned())
    }

    async fn find_by_login(&self, identifier: &str) -> AppResult<Option<Rider>> {
        let tables = self.tables.read().await;
        Ok(tables
            .riders
            .values()
            .find(|r| r.phone == identifier || r.email.eq_ignore_ascii_case(identifier))
            .cloned())
    }

    async fn list(&self) -> AppResult<Vec<Rider>> {
        let tables = self.tables.read().await;
        let mut riders: Vec<Rider> = tables.riders.values().cloned().collect();
        riders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(riders)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        email: Option<String>,
    ) -> AppResult<Rider> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &email {
            if tables.login_taken("", email, Some(id)) {
                return Err(conflict_error("Rider", "email", email));
            }
        }
        let rider = tables
            .riders
            .get_mut(&id)
            .ok_or_else(|| not_found_error("Rider", id))?;
        if let Some(name) = name {
            rider.name = name;
        }
        if let Some(email) = email {
            rider.email = email;
        }
        Ok(rider.clone())
    }

    async fn set_password_if_unset(&self, id: Uuid, password_hash: String) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.riders.get_mut(&id) {
            Some(rider) if rider.password_hash.is_none() => {
                rider.password_hash = Some(password_hash);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<Rider> {
        let mut tables = self.tables.write().await;
        let rider = tables
            .riders
            .get_mut(&id)
            .ok_or_else(|| not_found_error("Rider", id))?;
        rider.is_active = active;
        Ok(rider.clone())
    }

    async fn record_last_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(rider) = self.tables.write().await.riders.get_mut(&id) {
            rider.last_login_at = Some(at);
        }
        Ok(())
    }

    async fn upsert_kyc(&self, kyc: RiderKyc) -> AppResult<RiderKyc> {
        let mut tables = self.tables.write().await;
        let merged = match tables.kyc.remove(&kyc.rider_id) {
            Some(current) => RiderKyc {
                rider_id: kyc.rider_id,
                aadhaar_number: kyc.aadhaar_number.or(current.aadhaar_number),
                pan_number: kyc.pan_number.or(current.pan_number),
                dl_number: kyc.dl_number.or(current.dl_number),
                aadhaar_image_url: kyc.aadhaar_image_url.or(current.aadhaar_image_url),
                pan_image_url: kyc.pan_image_url.or(current.pan_image_url),
                dl_image_url: kyc.dl_image_url.or(current.dl_image_url),
                updated_at: kyc.updated_at,
            },
            None => kyc,
        };
        tables.kyc.insert(merged.rider_id, merged.clone());
        Ok(merged)
    }

    async fn find_kyc(&self, rider_id: Uuid) -> AppResult<Option<RiderKyc>> {
        Ok(self.tables.read().await.kyc.get(&rider_id).cloned())
    }
}

#[async_trait]
impl RentalRepository for InMemoryStore {
    async fn insert_if_available(&self, rental: Rental) -> AppResult<Rental> {
        let mut tables = self.tables.write().await;
        tables.ensure_capacity(
            rental.vehicle_id,
            rental.start_date,
            rental.expected_return_date,
            None,
        )?;
        tables.rentals.insert(rental.id, rental.clone());
        Ok(rental)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Rental>> {
        Ok(self.tables.read().await.rentals.get(&id).cloned())
    }

    async fn list_by_rider(&self, rider_id: Uuid) -> AppResult<Vec<Rental>> {
        let tables = self.tables.read().await;
        let mut rentals: Vec<Rental> = tables
            .rentals
            .values()
            .filter(|r| r.rider_id == rider_id)
            .cloned()
            .collect();
        rentals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rentals)
    }

    async fn list(&self, status: Option<RentalStatus>) -> AppResult<Vec<Rental>> {
        let tables = self.tables.read().await;
        let mut rentals: Vec<Rental> = tables
            .rentals
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        rentals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rentals)
    }

    async fn list_alert_candidates(&self) -> AppResult<Vec<Rental>> {
        let tables = self.tables.read().await;
        let candidates = tables
            .rentals
            .values()
            .filter(|r| {
                matches!(
                    r.status,
                    RentalStatus::Booked
                        | RentalStatus::Confirmed
                        | RentalStatus::Ongoing
                        | RentalStatus::Overdue
                ) && r.actual_return_date.is_none()
            })
            .cloned()
            .collect();
        Ok(sorted(candidates, |r| r.expected_return_date))
    }

    async fn update_atomically(
        &self,
        id: Uuid,
        owner: Option<Uuid>,
        mutation: RentalMutation<'_>,
    ) -> AppResult<Rental> {
        let mut tables = self.tables.write().await;
        let before = tables
            .rentals
            .get(&id)
            .filter(|r| owner.map_or(true, |o| r.rider_id == o))
            .cloned()
            .ok_or_else(|| not_found_error("Rental", id))?;

        let after = mutation(before.clone())?;

        let dates_moved = after.start_date != before.start_date
            || after.expected_return_date != before.expected_return_date;
        let reactivated = after.status.is_active() && !before.status.is_active();
        if after.status.is_active() && (dates_moved || reactivated) {
            tables.ensure_capacity(
                after.vehicle_id,
                after.start_date,
                after.expected_return_date,
                Some(after.id),
            )?;
        }

        tables.rentals.insert(id, after.clone());
        Ok(after)
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn create_order(&self, order: PaymentOrder) -> AppResult<PaymentOrder> {
        let mut tables = self.tables.write().await;
        if tables.orders.contains_key(&order.order_id) {
            return Err(conflict_error("Payment order", "order_id", &order.order_id));
        }
        tables.orders.insert(order.order_id.clone(), order.clone());
        Ok(order)
    }

    async fn find_order(&self, order_id: &str) -> AppResult<Option<PaymentOrder>> {
        Ok(self.tables.read().await.orders.get(order_id).cloned())
    }

    async fn record_gateway_payment(&self, payment: Payment) -> AppResult<ReconcileOutcome> {
        let mut tables = self.tables.write().await;

        let current = tables
            .payments
            .get(&payment.gateway_reference)
            .map(|p| p.status);

        let outcome = match current {
            None => {
                tables
                    .payments
                    .insert(payment.gateway_reference.clone(), payment.clone());
                let credited =
                    payment.status == PaymentStatus::Success && tables.credit(&payment);
                ReconcileOutcome::Recorded { credited }
            }
            Some(status) if status != PaymentStatus::Success => {
                if let Some(stored) = tables.payments.get_mut(&payment.gateway_reference) {
                    stored.status = payment.status;
                    stored.amount = payment.amount;
                    stored.transaction_at = payment.transaction_at;
                }
                if payment.status == PaymentStatus::Success {
                    tables.credit(&payment);
                    ReconcileOutcome::Upgraded
                } else {
                    ReconcileOutcome::Duplicate
                }
            }
            Some(_) => ReconcileOutcome::Duplicate,
        };

        Ok(outcome)
    }

    async fn list_by_rider(&self, rider_id: Uuid) -> AppResult<Vec<Payment>> {
        let tables = self.tables.read().await;
        let mut payments: Vec<Payment> = tables
            .payments
            .values()
            .filter(|p| p.rider_id == rider_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.transaction_at.cmp(&a.transaction_at));
        Ok(payments)
    }
}

#[async_trait]
impl InventoryRepository for InMemoryStore {
    async fn create(&self, item: InventoryItem) -> AppResult<InventoryItem> {
        let mut tables = self.tables.write().await;
        if tables
            .inventory
            .values()
            .any(|i| i.serial_number == item.serial_number)
        {
            return Err(conflict_error(
                "Inventory item",
                "serial_number",
                &item.serial_number,
            ));
        }
        tables.inventory.insert(item.id, item.clone());
        Ok(item)
    }

    async fn list(&self) -> AppResult<Vec<InventoryItem>> {
        let tables = self.tables.read().await;
        Ok(sorted(tables.inventory.values().cloned().collect(), |i| {
            i.serial_number.clone()
        }))
    }

    async fn assign(&self, id: Uuid, rental_id: Uuid) -> AppResult<InventoryItem> {
        let mut tables = self.tables.write().await;
        let item = tables
            .inventory
            .get_mut(&id)
            .ok_or_else(|| not_found_error("Inventory item", id))?;
        if item.stock_status != StockStatus::InStock {
            return Err(AppError::Conflict(format!(
                "Inventory item {} is not in stock ({:?})",
                item.serial_number, item.stock_status
            )));
        }
        item.stock_status = StockStatus::Assigned;
        item.assigned_rental_id = Some(rental_id);
        Ok(item.clone())
    }

    async fn release(&self, id: Uuid) -> AppResult<InventoryItem> {
        let mut tables = self.tables.write().await;
        let item = tables
            .inventory
            .get_mut(&id)
            .ok_or_else(|| not_found_error("Inventory item", id))?;
        item.stock_status = StockStatus::InStock;
        item.assigned_rental_id = None;
        Ok(item.clone())
    }

    async fn release_for_rental(&self, rental_id: Uuid) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let mut released = 0;
        for item in tables
            .inventory
            .values_mut()
            .filter(|i| i.assigned_rental_id == Some(rental_id))
        {
            item.stock_status = StockStatus::InStock;
            item.assigned_rental_id = None;
            released += 1;
        }
        Ok(released)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Builders shared by the service tests

    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use crate::models::plan::Plan;
    use crate::models::rental::{BreakdownLine, PaymentOption, PricingSnapshot, Rental, RentalStatus};
    use crate::models::rider::Rider;
    use crate::models::vehicle::Vehicle;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn plan(joining_fee: Decimal, deposit: Decimal) -> Plan {
        Plan {
            id: Uuid::new_v4(),
            name: "Standard".to_string(),
            joining_fee,
            security_deposit: deposit,
            required_documents: vec!["AADHAAR".to_string()],
            created_at: Utc::now(),
        }
    }

    pub fn vehicle(rent_per_day: Decimal, quantity: i32, plan_id: Option<Uuid>) -> Vehicle {
        Vehicle {
            id: Uuid::new_v4(),
            model: "E-Scooter".to_string(),
            rent_per_day,
            image_urls: Vec::new(),
            quantity,
            plan_id,
            created_at: Utc::now(),
        }
    }

    pub fn rider(phone: &str, email: &str) -> Rider {
        Rider {
            id: Uuid::new_v4(),
            name: "Asha Rider".to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
            password_hash: None,
            is_active: true,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    /// Rental with a flat payable and nothing paid
    pub fn rental(
        rider_id: Uuid,
        vehicle_id: Uuid,
        status: RentalStatus,
        start: NaiveDate,
        end: NaiveDate,
        payable: Decimal,
    ) -> Rental {
        let now = Utc::now();
        Rental {
            id: Uuid::new_v4(),
            rider_id,
            vehicle_id,
            plan_id: Uuid::new_v4(),
            status,
            start_date: start,
            expected_return_date: end,
            actual_return_date: None,
            rate_per_day: Decimal::ZERO,
            payable_total: payable,
            paid_total: Decimal::ZERO,
            pricing: PricingSnapshot {
                payment_option: PaymentOption::Full,
                days: 1,
                rent_per_day: Decimal::ZERO,
                joining_fee: payable,
                deposit: Decimal::ZERO,
                usage: Decimal::ZERO,
                custom_amount: None,
                payable,
                breakdown: vec![BreakdownLine {
                    label: "Joining fee".to_string(),
                    amount: payable,
                }],
                extended_to: None,
                history: Vec::new(),
            },
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use rust_decimal_macros::dec;

    fn success_payment(order: &PaymentOrder, reference: &str, amount: rust_decimal::Decimal) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            rider_id: order.rider_id,
            rental_id: order.rental_id,
            order_id: order.order_id.clone(),
            gateway_reference: reference.to_string(),
            amount,
            status: PaymentStatus::Success,
            transaction_at: Utc::now(),
        }
    }

    async fn seeded_rental(store: &InMemoryStore, status: RentalStatus) -> (Rental, PaymentOrder) {
        let vehicle = VehicleRepository::create(store, vehicle(dec!(100), 1, None))
            .await
            .unwrap();
        let rental = store
            .insert_if_available(rental(
                Uuid::new_v4(),
                vehicle.id,
                status,
                date(2024, 1, 1),
                date(2024, 1, 3),
                dec!(500),
            ))
            .await
            .unwrap();
        let order = store
            .create_order(PaymentOrder {
                order_id: "RENT-test-1".to_string(),
                rider_id: rental.rider_id,
                rental_id: Some(rental.id),
                purpose: crate::models::payment::PaymentPurpose::Rental,
                amount_minor: 50_000,
                session_handle: "session".to_string(),
                status: PaymentStatus::Pending,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        (rental, order)
    }

    #[tokio::test]
    async fn test_capacity_is_enforced_on_insert() {
        let store = InMemoryStore::new();
        let vehicle = VehicleRepository::create(&store, vehicle(dec!(100), 1, None))
            .await
            .unwrap();
        let first = rental(
            Uuid::new_v4(),
            vehicle.id,
            RentalStatus::Booked,
            date(2024, 1, 1),
            date(2024, 1, 5),
            dec!(100),
        );
        store.insert_if_available(first).await.unwrap();

        let overlapping = rental(
            Uuid::new_v4(),
            vehicle.id,
            RentalStatus::Booked,
            date(2024, 1, 5),
            date(2024, 1, 8),
            dec!(100),
        );
        assert!(matches!(
            store.insert_if_available(overlapping).await,
            Err(AppError::Conflict(_))
        ));

        let disjoint = rental(
            Uuid::new_v4(),
            vehicle.id,
            RentalStatus::Booked,
            date(2024, 1, 6),
            date(2024, 1, 8),
            dec!(100),
        );
        assert!(store.insert_if_available(disjoint).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_rentals_free_the_unit() {
        let store = InMemoryStore::new();
        let vehicle = VehicleRepository::create(&store, vehicle(dec!(100), 1, None))
            .await
            .unwrap();
        store
            .insert_if_available(rental(
                Uuid::new_v4(),
                vehicle.id,
                RentalStatus::Cancelled,
                date(2024, 1, 1),
                date(2024, 1, 5),
                dec!(100),
            ))
            .await
            .unwrap();

        let count = store
            .count_active_overlapping(vehicle.id, date(2024, 1, 1), date(2024, 1, 5))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_row_untouched() {
        let store = InMemoryStore::new();
        let (rental, _) = seeded_rental(&store, RentalStatus::Confirmed).await;

        let result = store
            .update_atomically(rental.id, None, &|_| {
                Err(AppError::Conflict("nope".to_string()))
            })
            .await;
        assert!(result.is_err());

        let stored = RentalRepository::find_by_id(&store, rental.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, rental);
    }

    #[tokio::test]
    async fn test_update_scoped_to_owner() {
        let store = InMemoryStore::new();
        let (rental, _) = seeded_rental(&store, RentalStatus::Confirmed).await;

        let result = store
            .update_atomically(rental.id, Some(Uuid::new_v4()), &|r| Ok(r))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_success_payment_credits_once() {
        let store = InMemoryStore::new();
        let (rental, order) = seeded_rental(&store, RentalStatus::Booked).await;

        let first = store
            .record_gateway_payment(success_payment(&order, "cf-1", dec!(500)))
            .await
            .unwrap();
        assert_eq!(first, ReconcileOutcome::Recorded { credited: true });

        let replay = store
            .record_gateway_payment(success_payment(&order, "cf-1", dec!(500)))
            .await
            .unwrap();
        assert_eq!(replay, ReconcileOutcome::Duplicate);

        let stored = RentalRepository::find_by_id(&store, rental.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.paid_total, dec!(500));
        assert_eq!(stored.status, RentalStatus::Confirmed);
        assert_eq!(
            store.find_order(&order.order_id).await.unwrap().unwrap().status,
            PaymentStatus::Success
        );
    }

    #[tokio::test]
    async fn test_pending_payment_upgrades_to_success() {
        let store = InMemoryStore::new();
        let (rental, order) = seeded_rental(&store, RentalStatus::Booked).await;

        let mut pending = success_payment(&order, "cf-2", dec!(200));
        pending.status = PaymentStatus::Pending;
        assert_eq!(
            store.record_gateway_payment(pending).await.unwrap(),
            ReconcileOutcome::Recorded { credited: false }
        );

        assert_eq!(
            store
                .record_gateway_payment(success_payment(&order, "cf-2", dec!(200)))
                .await
                .unwrap(),
            ReconcileOutcome::Upgraded
        );

        let stored = RentalRepository::find_by_id(&store, rental.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.paid_total, dec!(200));
        assert_eq!(stored.balance_due(), dec!(300));
    }

    #[tokio::test]
    async fn test_duplicate_rider_contact_conflicts() {
        let store = InMemoryStore::new();
        RiderRepository::create(&store, rider("9876543210", "asha@example.com"))
            .await
            .unwrap();
        let again = RiderRepository::create(&store, rider("9000000000", "ASHA@example.com")).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_plan_delete_blocked_while_referenced() {
        let store = InMemoryStore::new();
        let plan = PlanRepository::create(&store, plan(dec!(100), dec!(500)))
            .await
            .unwrap();
        VehicleRepository::create(&store, vehicle(dec!(100), 1, Some(plan.id)))
            .await
            .unwrap();
        assert!(matches!(
            store.delete_if_unreferenced(plan.id).await,
            Err(AppError::Conflict(_))
        ));
    }
}
