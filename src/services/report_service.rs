//! Back-office summary report

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::rental::{Rental, RentalStatus};
use crate::models::vehicle::Vehicle;
use crate::repositories::{RentalRepository, RiderRepository, VehicleRepository};
use crate::utils::errors::AppResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub generated_at: DateTime<Utc>,
    pub riders_total: usize,
    pub riders_active: usize,
    pub fleet_units: i64,
    pub units_on_rent: usize,
    pub rentals_by_status: BTreeMap<String, usize>,
    pub payable_total: Decimal,
    pub paid_total: Decimal,
    pub outstanding_total: Decimal,
}

/// Money is summed over rentals that were not cancelled
pub fn summarize(
    rentals: &[Rental],
    vehicles: &[Vehicle],
    riders_total: usize,
    riders_active: usize,
) -> ReportSummary {
    let mut rentals_by_status: BTreeMap<String, usize> = RentalStatus::ALL
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();
    for rental in rentals {
        *rentals_by_status
            .entry(rental.status.as_str().to_string())
            .or_default() += 1;
    }

    let billable = rentals
        .iter()
        .filter(|r| r.status != RentalStatus::Cancelled);
    let payable_total: Decimal = billable.clone().map(|r| r.payable_total).sum();
    let paid_total: Decimal = billable.map(|r| r.paid_total).sum();

    ReportSummary {
        generated_at: Utc::now(),
        riders_total,
        riders_active,
        fleet_units: vehicles.iter().map(|v| i64::from(v.quantity)).sum(),
        units_on_rent: rentals.iter().filter(|r| r.status.is_active()).count(),
        rentals_by_status,
        payable_total,
        paid_total,
        outstanding_total: payable_total - paid_total,
    }
}

pub struct ReportService {
    rentals: Arc<dyn RentalRepository>,
    vehicles: Arc<dyn VehicleRepository>,
    riders: Arc<dyn RiderRepository>,
}

impl ReportService {
    pub fn new(
        rentals: Arc<dyn RentalRepository>,
        vehicles: Arc<dyn VehicleRepository>,
        riders: Arc<dyn RiderRepository>,
    ) -> Self {
        Self {
            rentals,
            vehicles,
            riders,
        }
    }

    pub async fn summary(&self) -> AppResult<ReportSummary> {
        let (rentals, vehicles, riders) = futures::try_join!(
            self.rentals.list(None),
            self.vehicles.list(),
            self.riders.list()
        )?;
        let active = riders.iter().filter(|r| r.is_active).count();
        Ok(summarize(&rentals, &vehicles, riders.len(), active))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::in_memory::fixtures::{date, rental, vehicle};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_summarize() {
        let fleet = vec![vehicle(dec!(50), 3, None), vehicle(dec!(80), 2, None)];
        let mut paid = rental(
            Uuid::new_v4(),
            fleet[0].id,
            RentalStatus::Ongoing,
            date(2025, 1, 1),
            date(2025, 1, 5),
            dec!(2500),
        );
        paid.paid_total = dec!(1000);
        let cancelled = rental(
            Uuid::new_v4(),
            fleet[1].id,
            RentalStatus::Cancelled,
            date(2025, 1, 1),
            date(2025, 1, 5),
            dec!(900),
        );

        let report = summarize(&[paid, cancelled], &fleet, 4, 3);
        assert_eq!(report.fleet_units, 5);
        assert_eq!(report.units_on_rent, 1);
        assert_eq!(report.rentals_by_status["ONGOING"], 1);
        assert_eq!(report.rentals_by_status["CANCELLED"], 1);
        assert_eq!(report.rentals_by_status["BOOKED"], 0);
        assert_eq!(report.payable_total, dec!(2500));
        assert_eq!(report.outstanding_total, dec!(1500));
    }
}
