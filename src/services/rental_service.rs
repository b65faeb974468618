//! Rental lifecycle
//!
//! Booking, extension, return requests and the staff workflow that moves a
//! rental along its status graph. Every change goes through
//! `RentalRepository::update_atomically`, so a rejected change never leaves
//! a half-written rental behind.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dto::rental_dto::CreateRentalRequest;
use crate::models::rental::{
    BreakdownLine, ExtensionRecord, PaymentOption, Rental, RentalStatus,
};
use crate::repositories::{
    InventoryRepository, PlanRepository, RentalRepository, RiderRepository, VehicleRepository,
};
use crate::services::pricing_service::{calculate_quote, rental_days};
use crate::utils::errors::{not_found_error, validation_error, AppError, AppResult};
use crate::utils::money::{checked_total, checked_usage};
use crate::utils::validation::ensure_date_range;

/// Who is placing a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingActor {
    /// A rider booking for themselves
    Rider(Uuid),
    /// Staff booking on a rider's behalf
    Admin,
}

/// Apply an extension to a rental that is still in memory
pub fn apply_extension(mut rental: Rental, new_end: NaiveDate) -> AppResult<Rental> {
    if !rental.status.is_extendable() {
        return Err(AppError::Conflict(format!(
            "Rental {} cannot be extended while {}",
            rental.id, rental.status
        )));
    }
    if new_end <= rental.expected_return_date {
        return Err(validation_error(
            "new_end_date",
            format!(
                "new end date must be after the current return date {}",
                rental.expected_return_date
            ),
        ));
    }

    let previous_days = rental.pricing.days;
    let previous_payable = rental.payable_total;
    let days = rental_days(rental.start_date, new_end)?;
    let usage = checked_usage("new_end_date", rental.rate_per_day, days)?;
    let delta = usage - rental.pricing.usage;

    rental.payable_total = checked_total("new_end_date", [rental.payable_total, delta])?;
    rental.pricing.payable = checked_total("new_end_date", [rental.pricing.payable, delta])?;
    rental.pricing.days = days;
    rental.pricing.usage = usage;
    rental.pricing.extended_to = Some(new_end);
    rental.pricing.breakdown.push(BreakdownLine {
        label: format!("Extension usage (+{} days)", days - previous_days),
        amount: delta,
    });
    rental.pricing.history.push(ExtensionRecord {
        from_date: rental.expected_return_date,
        to_date: new_end,
        previous_days,
        days,
        previous_payable,
        payable: rental.payable_total,
        extended_at: Utc::now(),
    });
    rental.expected_return_date = new_end;
    rental.updated_at = Utc::now();

    Ok(rental)
}

pub struct RentalService {
    rentals: Arc<dyn RentalRepository>,
    plans: Arc<dyn PlanRepository>,
    vehicles: Arc<dyn VehicleRepository>,
    riders: Arc<dyn RiderRepository>,
    inventory: Arc<dyn InventoryRepository>,
}

impl RentalService {
    pub fn new(
        rentals: Arc<dyn RentalRepository>,
        plans: Arc<dyn PlanRepository>,
        vehicles: Arc<dyn VehicleRepository>,
        riders: Arc<dyn RiderRepository>,
        inventory: Arc<dyn InventoryRepository>,
    ) -> Self {
        Self {
            rentals,
            plans,
            vehicles,
            riders,
            inventory,
        }
    }

    pub async fn create(
        &self,
        actor: BookingActor,
        request: CreateRentalRequest,
    ) -> AppResult<Rental> {
        let payment_option: PaymentOption = request.payment_option.parse()?;
        let rider_id = match actor {
            BookingActor::Rider(rider_id) => {
                if payment_option == PaymentOption::JoiningDepositPlusCustom {
                    return Err(validation_error(
                        "payment_option",
                        "riders can pay in full or joining fee and deposit only",
                    ));
                }
                rider_id
            }
            BookingActor::Admin => request
                .rider_id
                .ok_or_else(|| validation_error("rider_id", "rider_id is required"))?,
        };
        ensure_date_range(request.start_date, request.end_date)?;

        let (rider, plan, vehicle) = futures::try_join!(
            self.riders.find_by_id(rider_id),
            self.plans.find_by_id(request.plan_id),
            self.vehicles.find_by_id(request.vehicle_id)
        )?;
        let rider = rider.ok_or_else(|| not_found_error("Rider", rider_id))?;
        let plan = plan.ok_or_else(|| not_found_error("Plan", request.plan_id))?;
        let vehicle = vehicle.ok_or_else(|| not_found_error("Vehicle", request.vehicle_id))?;

        if !rider.is_active {
            return Err(AppError::Forbidden(format!(
                "Rider {} is inactive and cannot book",
                rider.id
            )));
        }
        if vehicle.plan_id.is_some_and(|bound| bound != plan.id) {
            return Err(validation_error(
                "plan_id",
                "vehicle is not offered under the selected plan",
            ));
        }

        let quote = calculate_quote(
            &plan,
            vehicle.rent_per_day,
            request.start_date,
            request.end_date,
            payment_option,
            request.custom_amount,
        )?;

        let status = if quote.payable.is_zero() {
            RentalStatus::Confirmed
        } else {
            RentalStatus::Booked
        };
        let now = Utc::now();
        let rental = Rental {
            id: Uuid::new_v4(),
            rider_id: rider.id,
            vehicle_id: vehicle.id,
            plan_id: plan.id,
            status,
            start_date: request.start_date,
            expected_return_date: request.end_date,
            actual_return_date: None,
            rate_per_day: vehicle.rent_per_day,
            payable_total: quote.payable,
            paid_total: Decimal::ZERO,
            pricing: quote.into_snapshot(),
            created_at: now,
            updated_at: now,
        };

        let rental = self.rentals.insert_if_available(rental).await?;
        info!(
            rental_id = %rental.id,
            rider_id = %rental.rider_id,
            vehicle_id = %rental.vehicle_id,
            "✅ Rental booked ({}, payable {})",
            rental.status,
            rental.payable_total
        );
        Ok(rental)
    }

    pub async fn extend(
        &self,
        rental_id: Uuid,
        rider_id: Uuid,
        new_end: NaiveDate,
    ) -> AppResult<Rental> {
        let rental = self
            .rentals
            .update_atomically(rental_id, Some(rider_id), &|rental| {
                apply_extension(rental, new_end)
            })
            .await?;

        info!(
            rental_id = %rental.id,
            "📅 Rental extended to {} (payable {})",
            rental.expected_return_date,
            rental.payable_total
        );
        Ok(rental)
    }

    pub async fn request_return(&self, rental_id: Uuid, rider_id: Uuid) -> AppResult<Rental> {
        let rental = self
            .rentals
            .update_atomically(rental_id, Some(rider_id), &|mut rental| {
                if !matches!(rental.status, RentalStatus::Confirmed | RentalStatus::Ongoing) {
                    return Err(AppError::Conflict(format!(
                        "Return cannot be requested while the rental is {}",
                        rental.status
                    )));
                }
                rental.transition_to(RentalStatus::ReturnRequested)?;
                Ok(rental)
            })
            .await?;

        info!(rental_id = %rental.id, "↩️ Return requested");
        Ok(rental)
    }

    pub async fn list_for_rider(&self, rider_id: Uuid) -> AppResult<Vec<Rental>> {
        self.rentals.list_by_rider(rider_id).await
    }

    /// Someone else's rental is reported as missing
    pub async fn get_for_rider(&self, rental_id: Uuid, rider_id: Uuid) -> AppResult<Rental> {
        self.rentals
            .find_by_id(rental_id)
            .await?
            .filter(|rental| rental.rider_id == rider_id)
            .ok_or_else(|| not_found_error("Rental", rental_id))
    }

    pub async fn get(&self, rental_id: Uuid) -> AppResult<Rental> {
        self.rentals
            .find_by_id(rental_id)
            .await?
            .ok_or_else(|| not_found_error("Rental", rental_id))
    }

    pub async fn list(&self, status: Option<&str>) -> AppResult<Vec<Rental>> {
        let status = status.map(str::parse::<RentalStatus>).transpose()?;
        self.rentals.list(status).await
    }

    async fn transition(&self, rental_id: Uuid, next: RentalStatus) -> AppResult<Rental> {
        let rental = self
            .rentals
            .update_atomically(rental_id, None, &|mut rental| {
                rental.transition_to(next)?;
                Ok(rental)
            })
            .await?;

        info!(rental_id = %rental.id, "🔄 Rental moved to {}", rental.status);
        Ok(rental)
    }

    /// Hand the vehicle over
    pub async fn start(&self, rental_id: Uuid) -> AppResult<Rental> {
        self.transition(rental_id, RentalStatus::Ongoing).await
    }

    /// Vehicle is back; stamps the return date and puts loaned items back in stock
    pub async fn complete_return(
        &self,
        rental_id: Uuid,
        returned_on: Option<NaiveDate>,
    ) -> AppResult<Rental> {
        let returned_on = returned_on.unwrap_or_else(|| Utc::now().date_naive());
        let rental = self
            .rentals
            .update_atomically(rental_id, None, &|mut rental| {
                if returned_on < rental.start_date {
                    return Err(validation_error(
                        "returned_on",
                        "return date cannot be before the rental start",
                    ));
                }
                rental.transition_to(RentalStatus::Returned)?;
                rental.actual_return_date = Some(returned_on);
                Ok(rental)
            })
            .await?;

        self.release_inventory(rental.id).await;
        info!(rental_id = %rental.id, "✅ Rental returned on {}", returned_on);
        Ok(rental)
    }

    pub async fn complete(&self, rental_id: Uuid) -> AppResult<Rental> {
        self.transition(rental_id, RentalStatus::Completed).await
    }

    pub async fn cancel(&self, rental_id: Uuid) -> AppResult<Rental> {
        let rental = self.transition(rental_id, RentalStatus::Cancelled).await?;
        self.release_inventory(rental.id).await;
        Ok(rental)
    }

    /// Set any status, bypassing the lifecycle graph
    pub async fn override_status(
        &self,
        rental_id: Uuid,
        status: &str,
        admin: &str,
        reason: Option<&str>,
    ) -> AppResult<Rental> {
        let next: RentalStatus = status.parse()?;
        let today = Utc::now().date_naive();

        let rental = self
            .rentals
            .update_atomically(rental_id, None, &|mut rental| {
                if matches!(next, RentalStatus::Returned | RentalStatus::Completed)
                    && rental.actual_return_date.is_none()
                {
                    rental.actual_return_date = Some(today);
                }
                rental.status = next;
                rental.updated_at = Utc::now();
                Ok(rental)
            })
            .await?;

        warn!(
            rental_id = %rental.id,
            admin,
            reason = reason.unwrap_or("-"),
            "🛠️ Administrative status override to {}",
            next
        );

        if !next.is_active() {
            self.release_inventory(rental.id).await;
        }
        Ok(rental)
    }

    /// Inventory release is a follow-up to a committed status change
    async fn release_inventory(&self, rental_id: Uuid) {
        match self.inventory.release_for_rental(rental_id).await {
            Ok(0) => {}
            Ok(count) => info!(rental_id = %rental_id, "📦 Released {} inventory items", count),
            Err(e) => warn!(rental_id = %rental_id, "⚠️ Could not release inventory: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::in_memory::fixtures::{date, plan, rider, vehicle};
    use crate::repositories::InMemoryStore;
    use crate::models::inventory::{InventoryItem, InventoryType, StockStatus};
    use rust_decimal_macros::dec;

    struct Fixture {
        store: Arc<InMemoryStore>,
        service: RentalService,
        rider_id: Uuid,
        plan_id: Uuid,
        vehicle_id: Uuid,
    }

    async fn fixture(quantity: i32) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let plan = PlanRepository::create(store.as_ref(), plan(dec!(500), dec!(1750)))
            .await
            .unwrap();
        let vehicle =
            VehicleRepository::create(store.as_ref(), vehicle(dec!(50), quantity, Some(plan.id)))
                .await
                .unwrap();
        let rider = RiderRepository::create(store.as_ref(), rider("9876543210", "asha@example.com"))
            .await
            .unwrap();
        let service = RentalService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        );
        Fixture {
            store,
            service,
            rider_id: rider.id,
            plan_id: plan.id,
            vehicle_id: vehicle.id,
        }
    }

    fn booking(f: &Fixture, start: NaiveDate, end: NaiveDate, option: &str) -> CreateRentalRequest {
        CreateRentalRequest {
            rider_id: None,
            plan_id: f.plan_id,
            vehicle_id: f.vehicle_id,
            start_date: start,
            end_date: end,
            payment_option: option.to_string(),
            custom_amount: None,
        }
    }

    #[tokio::test]
    async fn test_booking_snapshots_price() {
        let f = fixture(1).await;
        let rental = f
            .service
            .create(
                BookingActor::Rider(f.rider_id),
                booking(&f, date(2025, 1, 1), date(2025, 1, 5), "FULL"),
            )
            .await
            .unwrap();

        assert_eq!(rental.status, RentalStatus::Booked);
        assert_eq!(rental.payable_total, dec!(2500));
        assert_eq!(rental.balance_due(), dec!(2500));
        assert_eq!(rental.rate_per_day, dec!(50));
        assert_eq!(rental.pricing.breakdown_total(), rental.payable_total);
    }

    #[tokio::test]
    async fn test_rider_cannot_pick_custom_option() {
        let f = fixture(1).await;
        let mut request = booking(&f, date(2025, 1, 1), date(2025, 1, 5), "JOINING_DEPOSIT_PLUS_CUSTOM");
        request.custom_amount = Some(dec!(10));

        let result = f.service.create(BookingActor::Rider(f.rider_id), request.clone()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        request.rider_id = Some(f.rider_id);
        let rental = f.service.create(BookingActor::Admin, request).await.unwrap();
        assert_eq!(rental.payable_total, dec!(2260));
    }

    #[tokio::test]
    async fn test_zero_payable_booking_is_confirmed() {
        let f = fixture(1).await;
        let free_plan = PlanRepository::create(f.store.as_ref(), plan(dec!(0), dec!(0)))
            .await
            .unwrap();
        let free_vehicle = VehicleRepository::create(f.store.as_ref(), vehicle(dec!(0), 1, None))
            .await
            .unwrap();
        let mut request = booking(&f, date(2025, 1, 1), date(2025, 1, 2), "FULL");
        request.plan_id = free_plan.id;
        request.vehicle_id = free_vehicle.id;

        let rental = f
            .service
            .create(BookingActor::Rider(f.rider_id), request)
            .await
            .unwrap();
        assert_eq!(rental.status, RentalStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_vehicle_bound_to_other_plan_is_rejected() {
        let f = fixture(1).await;
        let other = PlanRepository::create(f.store.as_ref(), plan(dec!(1), dec!(1)))
            .await
            .unwrap();
        let mut request = booking(&f, date(2025, 1, 1), date(2025, 1, 2), "FULL");
        request.plan_id = other.id;

        let result = f.service.create(BookingActor::Rider(f.rider_id), request).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_inactive_rider_cannot_book() {
        let f = fixture(1).await;
        f.store.set_active(f.rider_id, false).await.unwrap();

        let result = f
            .service
            .create(
                BookingActor::Rider(f.rider_id),
                booking(&f, date(2025, 1, 1), date(2025, 1, 2), "FULL"),
            )
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_concurrent_bookings_for_last_unit() {
        let f = fixture(1).await;
        let second_rider =
            RiderRepository::create(f.store.as_ref(), rider("9000000001", "ravi@example.com"))
                .await
                .unwrap();

        let (a, b) = tokio::join!(
            f.service.create(
                BookingActor::Rider(f.rider_id),
                booking(&f, date(2025, 1, 1), date(2025, 1, 5), "FULL"),
            ),
            f.service.create(
                BookingActor::Rider(second_rider.id),
                booking(&f, date(2025, 1, 3), date(2025, 1, 8), "FULL"),
            )
        );

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!([a, b]
            .into_iter()
            .any(|r| matches!(r, Err(AppError::Conflict(_)))));
    }

    #[tokio::test]
    async fn test_extension_adds_usage_delta() {
        let f = fixture(1).await;
        let rental = f
            .service
            .create(
                BookingActor::Rider(f.rider_id),
                booking(&f, date(2025, 1, 1), date(2025, 1, 5), "FULL"),
            )
            .await
            .unwrap();

        let extended = f
            .service
            .extend(rental.id, f.rider_id, date(2025, 1, 8))
            .await
            .unwrap();

        assert_eq!(extended.expected_return_date, date(2025, 1, 8));
        assert_eq!(extended.payable_total, rental.payable_total + dec!(150));
        assert_eq!(extended.pricing.days, 8);
        assert_eq!(extended.pricing.usage, dec!(400));
        assert_eq!(extended.pricing.extended_to, Some(date(2025, 1, 8)));
        assert_eq!(extended.pricing.history.len(), 1);
        assert_eq!(extended.pricing.breakdown_total(), extended.payable_total);
        assert_eq!(
            extended.pricing.breakdown.last().unwrap().label,
            "Extension usage (+3 days)"
        );
    }

    #[tokio::test]
    async fn test_failed_extension_changes_nothing() {
        let f = fixture(1).await;
        let rental = f
            .service
            .create(
                BookingActor::Rider(f.rider_id),
                booking(&f, date(2025, 1, 1), date(2025, 1, 5), "FULL"),
            )
            .await
            .unwrap();
        let blocker =
            RiderRepository::create(f.store.as_ref(), rider("9000000002", "blocker@example.com"))
                .await
                .unwrap();
        f.service
            .create(
                BookingActor::Rider(blocker.id),
                booking(&f, date(2025, 1, 7), date(2025, 1, 9), "FULL"),
            )
            .await
            .unwrap();

        let clash = f.service.extend(rental.id, f.rider_id, date(2025, 1, 8)).await;
        assert!(matches!(clash, Err(AppError::Conflict(_))));

        let earlier = f.service.extend(rental.id, f.rider_id, date(2025, 1, 5)).await;
        assert!(matches!(earlier, Err(AppError::Validation(_))));

        let stored = f.service.get(rental.id).await.unwrap();
        assert_eq!(stored.payable_total, rental.payable_total);
        assert_eq!(stored.expected_return_date, rental.expected_return_date);
    }

    #[tokio::test]
    async fn test_extension_by_other_rider_is_not_found() {
        let f = fixture(1).await;
        let rental = f
            .service
            .create(
                BookingActor::Rider(f.rider_id),
                booking(&f, date(2025, 1, 1), date(2025, 1, 5), "FULL"),
            )
            .await
            .unwrap();

        let result = f
            .service
            .extend(rental.id, Uuid::new_v4(), date(2025, 1, 8))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let stored = f.service.get(rental.id).await.unwrap();
        assert_eq!(stored.payable_total, rental.payable_total);
        assert_eq!(stored.expected_return_date, date(2025, 1, 5));
        assert!(stored.pricing.history.is_empty());
    }

    #[test]
    fn test_extension_beyond_amount_range_is_field_error() {
        let mut rental = crate::repositories::in_memory::fixtures::rental(
            Uuid::new_v4(),
            Uuid::new_v4(),
            RentalStatus::Confirmed,
            date(2025, 1, 1),
            date(2025, 1, 1),
            dec!(100),
        );
        rental.rate_per_day = dec!(9999999999);

        match apply_extension(rental, date(2025, 1, 10)) {
            Err(AppError::Validation(errors)) => {
                assert!(errors.field_errors().contains_key("new_end_date"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_return_request_rules() {
        let f = fixture(1).await;
        let rental = f
            .service
            .create(
                BookingActor::Rider(f.rider_id),
                booking(&f, date(2025, 1, 1), date(2025, 1, 5), "FULL"),
            )
            .await
            .unwrap();

        // Still BOOKED
        let early = f.service.request_return(rental.id, f.rider_id).await;
        assert!(matches!(early, Err(AppError::Conflict(_))));

        f.service
            .override_status(rental.id, "confirmed", "admin@rent.example", None)
            .await
            .unwrap();
        f.service.start(rental.id).await.unwrap();
        let requested = f.service.request_return(rental.id, f.rider_id).await.unwrap();
        assert_eq!(requested.status, RentalStatus::ReturnRequested);

        let returned = f
            .service
            .complete_return(rental.id, Some(date(2025, 1, 5)))
            .await
            .unwrap();
        assert_eq!(returned.status, RentalStatus::Returned);
        assert_eq!(returned.actual_return_date, Some(date(2025, 1, 5)));

        let again = f.service.request_return(rental.id, f.rider_id).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
        assert_eq!(
            f.service.get(rental.id).await.unwrap().status,
            RentalStatus::Returned
        );

        let completed = f.service.complete(rental.id).await.unwrap();
        assert_eq!(completed.status, RentalStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancel_releases_inventory() {
        let f = fixture(1).await;
        let rental = f
            .service
            .create(
                BookingActor::Rider(f.rider_id),
                booking(&f, date(2025, 1, 1), date(2025, 1, 5), "FULL"),
            )
            .await
            .unwrap();
        let item = InventoryRepository::create(
            f.store.as_ref(),
            InventoryItem {
                id: Uuid::new_v4(),
                item_type: InventoryType::Battery,
                serial_number: "BAT-001".to_string(),
                stock_status: StockStatus::InStock,
                assigned_rental_id: None,
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();
        f.store.assign(item.id, rental.id).await.unwrap();

        let cancelled = f.service.cancel(rental.id).await.unwrap();
        assert_eq!(cancelled.status, RentalStatus::Cancelled);

        let items = InventoryRepository::list(f.store.as_ref()).await.unwrap();
        assert_eq!(items[0].stock_status, StockStatus::InStock);
        assert_eq!(items[0].assigned_rental_id, None);
    }

    #[tokio::test]
    async fn test_list_filters_by_status_case_insensitively() {
        let f = fixture(2).await;
        f.service
            .create(
                BookingActor::Rider(f.rider_id),
                booking(&f, date(2025, 1, 1), date(2025, 1, 5), "FULL"),
            )
            .await
            .unwrap();

        assert_eq!(f.service.list(Some("booked")).await.unwrap().len(), 1);
        assert_eq!(f.service.list(Some("ONGOING")).await.unwrap().len(), 0);
        assert!(f.service.list(Some("lost")).await.is_err());
    }
}
