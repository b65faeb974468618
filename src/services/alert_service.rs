//! Due-soon scanner
//!
//! Buckets open rentals into overdue / due soon / starting soon and replaces
//! the stored snapshot. Rental rows are only read.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use tracing::info;

use crate::cache::AlertSnapshotStore;
use crate::models::alert::{AlertEntry, AlertSnapshot, AlertsSummary};
use crate::models::rental::{Rental, RentalStatus};
use crate::repositories::RentalRepository;
use crate::utils::errors::{validation_error, AppResult};

/// Longest look-ahead a refresh accepts
pub const MAX_WINDOW_DAYS: i64 = 365;

fn window_end(field: &'static str, today: NaiveDate, days: i64) -> AppResult<NaiveDate> {
    if !(0..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(validation_error(
            field,
            format!("window must be between 0 and {} days", MAX_WINDOW_DAYS),
        ));
    }
    today
        .checked_add_signed(Duration::days(days))
        .ok_or_else(|| validation_error(field, "window ends past the last representable date"))
}

/// Build the buckets for `today`. Both windows are inclusive.
pub fn compute_alerts(
    rentals: &[Rental],
    today: NaiveDate,
    due_soon_days: i64,
    starting_soon_days: i64,
) -> AppResult<AlertSnapshot> {
    let due_limit = window_end("due_soon_days", today, due_soon_days)?;
    let start_limit = window_end("starting_soon_days", today, starting_soon_days)?;

    let mut overdue = Vec::new();
    let mut due_soon = Vec::new();
    let mut starting_soon = Vec::new();

    for rental in rentals.iter().filter(|r| r.actual_return_date.is_none()) {
        let end = rental.expected_return_date;
        let running = matches!(rental.status, RentalStatus::Confirmed | RentalStatus::Ongoing);

        if (running || rental.status == RentalStatus::Overdue) && today > end {
            overdue.push(AlertEntry::new(rental, end, today));
        } else if running && end >= today && end <= due_limit {
            due_soon.push(AlertEntry::new(rental, end, today));
        }

        if rental.status == RentalStatus::Confirmed
            && rental.start_date >= today
            && rental.start_date <= start_limit
        {
            starting_soon.push(AlertEntry::new(rental, rental.start_date, today));
        }
    }

    overdue.sort_by_key(|e| e.days_until);
    due_soon.sort_by_key(|e| e.days_until);
    starting_soon.sort_by_key(|e| e.days_until);

    Ok(AlertSnapshot {
        generated_at: Utc::now(),
        reference_date: today,
        due_soon_days,
        starting_soon_days,
        overdue,
        due_soon,
        starting_soon,
    })
}

pub struct AlertService {
    rentals: Arc<dyn RentalRepository>,
    store: Arc<dyn AlertSnapshotStore>,
    default_due_soon_days: i64,
    default_starting_soon_days: i64,
}

impl AlertService {
    pub fn new(
        rentals: Arc<dyn RentalRepository>,
        store: Arc<dyn AlertSnapshotStore>,
        default_due_soon_days: i64,
        default_starting_soon_days: i64,
    ) -> Self {
        Self {
            rentals,
            store,
            default_due_soon_days,
            default_starting_soon_days,
        }
    }

    /// Recompute and replace the snapshot; windows fall back to the configured defaults
    pub async fn refresh(
        &self,
        due_soon_days: Option<i64>,
        starting_soon_days: Option<i64>,
    ) -> AppResult<AlertsSummary> {
        self.refresh_at(
            Utc::now().date_naive(),
            due_soon_days.unwrap_or(self.default_due_soon_days),
            starting_soon_days.unwrap_or(self.default_starting_soon_days),
        )
        .await
    }

    pub async fn refresh_at(
        &self,
        today: NaiveDate,
        due_soon_days: i64,
        starting_soon_days: i64,
    ) -> AppResult<AlertsSummary> {
        let candidates = self.rentals.list_alert_candidates().await?;
        let snapshot = compute_alerts(&candidates, today, due_soon_days, starting_soon_days)?;

        self.store.replace(&snapshot).await?;

        info!(
            "🔔 Alerts refreshed: {} overdue, {} due soon, {} starting soon",
            snapshot.overdue.len(),
            snapshot.due_soon.len(),
            snapshot.starting_soon.len()
        );

        Ok(snapshot.into())
    }

    pub async fn summary(&self) -> AppResult<AlertsSummary> {
        Ok(self
            .store
            .latest()
            .await?
            .map(AlertsSummary::from)
            .unwrap_or_else(AlertsSummary::empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryAlertStore;
    use crate::repositories::in_memory::fixtures::{date, rental, vehicle};
    use crate::repositories::{InMemoryStore, VehicleRepository};
    use crate::utils::errors::AppError;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn open(status: RentalStatus, start: NaiveDate, end: NaiveDate) -> Rental {
        rental(Uuid::new_v4(), Uuid::new_v4(), status, start, end, dec!(100))
    }

    #[test]
    fn test_ongoing_rental_due_in_two_days_is_due_soon() {
        let today = date(2025, 6, 10);
        let rentals = vec![open(RentalStatus::Ongoing, date(2025, 6, 1), date(2025, 6, 12))];

        let snapshot = compute_alerts(&rentals, today, 3, 7).unwrap();
        assert_eq!(snapshot.due_soon.len(), 1);
        assert_eq!(snapshot.due_soon[0].days_until, 2);
        assert!(snapshot.overdue.is_empty());
    }

    #[test]
    fn test_buckets() {
        let today = date(2025, 6, 10);
        let rentals = vec![
            open(RentalStatus::Overdue, date(2025, 5, 1), date(2025, 6, 1)),
            open(RentalStatus::Confirmed, date(2025, 6, 1), date(2025, 6, 9)),
            open(RentalStatus::Confirmed, date(2025, 6, 15), date(2025, 6, 30)),
            open(RentalStatus::Booked, date(2025, 6, 12), date(2025, 6, 13)),
            open(RentalStatus::Ongoing, date(2025, 6, 1), date(2025, 6, 10)),
            open(RentalStatus::Ongoing, date(2025, 6, 1), date(2025, 6, 20)),
        ];

        let snapshot = compute_alerts(&rentals, today, 3, 7).unwrap();
        assert_eq!(snapshot.overdue.len(), 2);
        assert_eq!(snapshot.overdue[0].days_until, -9);
        // Due today counts as due soon
        assert_eq!(snapshot.due_soon.len(), 1);
        assert_eq!(snapshot.due_soon[0].days_until, 0);
        // Booked rentals never start "soon"
        assert_eq!(snapshot.starting_soon.len(), 1);
        assert_eq!(snapshot.starting_soon[0].start_date, date(2025, 6, 15));
    }

    #[test]
    fn test_returned_rentals_are_skipped() {
        let today = date(2025, 6, 10);
        let mut returned = open(RentalStatus::Ongoing, date(2025, 6, 1), date(2025, 6, 5));
        returned.actual_return_date = Some(date(2025, 6, 5));

        let snapshot = compute_alerts(&[returned], today, 3, 7).unwrap();
        assert!(snapshot.overdue.is_empty());
    }

    #[test]
    fn test_negative_window_is_rejected() {
        let result = compute_alerts(&[], date(2025, 6, 10), -1, 7);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_oversized_window_is_field_error() {
        for (due, starting, field) in [
            (100_000_000, 7, "due_soon_days"),
            (3, MAX_WINDOW_DAYS + 1, "starting_soon_days"),
            (3, i64::MAX, "starting_soon_days"),
        ] {
            match compute_alerts(&[], date(2025, 6, 10), due, starting) {
                Err(AppError::Validation(errors)) => {
                    assert!(errors.field_errors().contains_key(field))
                }
                other => panic!("unexpected result: {:?}", other),
            }
        }

        assert!(compute_alerts(&[], date(2025, 6, 10), MAX_WINDOW_DAYS, MAX_WINDOW_DAYS).is_ok());
        assert!(compute_alerts(&[], chrono::NaiveDate::MAX, 0, 1).is_err());
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let store = Arc::new(InMemoryStore::new());
        let snapshots = Arc::new(InMemoryAlertStore::new());
        let service = AlertService::new(store.clone(), snapshots.clone(), 3, 7);

        assert_eq!(service.summary().await.unwrap(), AlertsSummary::empty());

        let vehicle = VehicleRepository::create(store.as_ref(), vehicle(dec!(50), 2, None))
            .await
            .unwrap();
        let today = date(2025, 6, 10);
        store
            .insert_if_available(rental(
                Uuid::new_v4(),
                vehicle.id,
                RentalStatus::Ongoing,
                date(2025, 6, 1),
                date(2025, 6, 12),
                dec!(100),
            ))
            .await
            .unwrap();

        let first = service.refresh_at(today, 3, 7).await.unwrap();
        assert_eq!(first.due_soon_count, 1);

        // Narrower window drops it; the snapshot is replaced, not merged
        service.refresh_at(today, 1, 7).await.unwrap();
        let summary = service.summary().await.unwrap();
        assert_eq!(summary.due_soon_count, 0);
        assert!(summary.generated_at.is_some());
    }
}
