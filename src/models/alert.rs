//! Alert snapshot
//!
//! Buckets produced by the due-soon scanner and the summary built from them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::rental::{Rental, RentalStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEntry {
    pub rental_id: Uuid,
    pub rider_id: Uuid,
    pub vehicle_id: Uuid,
    pub status: RentalStatus,
    pub start_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub balance_due: Decimal,
    /// Days from today to the relevant date; negative when it has passed
    pub days_until: i64,
}

impl AlertEntry {
    pub fn new(rental: &Rental, relevant_date: NaiveDate, today: NaiveDate) -> Self {
        Self {
            rental_id: rental.id,
            rider_id: rental.rider_id,
            vehicle_id: rental.vehicle_id,
            status: rental.status,
            start_date: rental.start_date,
            expected_return_date: rental.expected_return_date,
            balance_due: rental.balance_due(),
            days_until: relevant_date.signed_duration_since(today).num_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSnapshot {
    pub generated_at: DateTime<Utc>,
    pub reference_date: NaiveDate,
    pub due_soon_days: i64,
    pub starting_soon_days: i64,
    pub overdue: Vec<AlertEntry>,
    pub due_soon: Vec<AlertEntry>,
    pub starting_soon: Vec<AlertEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertsSummary {
    pub overdue_count: usize,
    pub due_soon_count: usize,
    pub starting_soon_count: usize,
    pub generated_at: Option<DateTime<Utc>>,
    pub overdue: Vec<AlertEntry>,
    pub due_soon: Vec<AlertEntry>,
    pub starting_soon: Vec<AlertEntry>,
}

impl AlertsSummary {
    pub fn empty() -> Self {
        Self {
            overdue_count: 0,
            due_soon_count: 0,
            starting_soon_count: 0,
            generated_at: None,
            overdue: Vec::new(),
            due_soon: Vec::new(),
            starting_soon: Vec::new(),
        }
    }
}

impl From<AlertSnapshot> for AlertsSummary {
    fn from(snapshot: AlertSnapshot) -> Self {
        Self {
            overdue_count: snapshot.overdue.len(),
            due_soon_count: snapshot.due_soon.len(),
            starting_soon_count: snapshot.starting_soon.len(),
            generated_at: Some(snapshot.generated_at),
            overdue: snapshot.overdue,
            due_soon: snapshot.due_soon,
            starting_soon: snapshot.starting_soon,
        }
    }
}
