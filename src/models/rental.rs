//! Rental model
//!
//! The rental record, its lifecycle status and the typed pricing snapshot
//! stored with it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

use crate::utils::errors::{validation_error, AppError};

/// Rental lifecycle status - maps to the ENUM rental_status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "rental_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalStatus {
    Booked,
    Confirmed,
    Ongoing,
    ReturnRequested,
    Returned,
    Overdue,
    Completed,
    Cancelled,
}

impl RentalStatus {
    pub const ALL: [RentalStatus; 8] = [
        RentalStatus::Booked,
        RentalStatus::Confirmed,
        RentalStatus::Ongoing,
        RentalStatus::ReturnRequested,
        RentalStatus::Returned,
        RentalStatus::Overdue,
        RentalStatus::Completed,
        RentalStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RentalStatus::Booked => "BOOKED",
            RentalStatus::Confirmed => "CONFIRMED",
            RentalStatus::Ongoing => "ONGOING",
            RentalStatus::ReturnRequested => "RETURN_REQUESTED",
            RentalStatus::Returned => "RETURNED",
            RentalStatus::Overdue => "OVERDUE",
            RentalStatus::Completed => "COMPLETED",
            RentalStatus::Cancelled => "CANCELLED",
        }
    }

    /// Holds a vehicle unit for its date range
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RentalStatus::Booked
                | RentalStatus::Confirmed
                | RentalStatus::Ongoing
                | RentalStatus::ReturnRequested
                | RentalStatus::Overdue
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RentalStatus::Completed | RentalStatus::Cancelled)
    }

    /// Edges of the lifecycle graph
    pub fn can_transition_to(&self, next: RentalStatus) -> bool {
        use RentalStatus::*;
        matches!(
            (self, next),
            (Booked, Confirmed)
                | (Booked, Cancelled)
                | (Confirmed, Ongoing)
                | (Confirmed, ReturnRequested)
                | (Confirmed, Overdue)
                | (Confirmed, Cancelled)
                | (Ongoing, ReturnRequested)
                | (Ongoing, Overdue)
                | (ReturnRequested, Returned)
                | (Overdue, Returned)
                | (Returned, Completed)
        )
    }

    /// States from which the rider may push the return date out
    pub fn is_extendable(&self) -> bool {
        matches!(
            self,
            RentalStatus::Booked | RentalStatus::Confirmed | RentalStatus::Ongoing | RentalStatus::Overdue
        )
    }
}

impl sqlx::postgres::PgHasArrayType for RentalStatus {
    fn array_type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("_rental_status")
    }
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RentalStatus {
    type Err = AppError;

    /// Case-insensitive; accepts `ongoing`, `ONGOING`, `return-requested`...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let canonical = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        RentalStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == canonical)
            .ok_or_else(|| validation_error("status", format!("unknown rental status '{}'", s)))
    }
}

/// How much of the price is collected up front
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOption {
    Full,
    JoiningDepositOnly,
    JoiningDepositPlusCustom,
}

impl PaymentOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentOption::Full => "FULL",
            PaymentOption::JoiningDepositOnly => "JOINING_DEPOSIT_ONLY",
            PaymentOption::JoiningDepositPlusCustom => "JOINING_DEPOSIT_PLUS_CUSTOM",
        }
    }
}

impl FromStr for PaymentOption {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "FULL" => Ok(PaymentOption::Full),
            "JOINING_DEPOSIT_ONLY" | "JOINING_DEPOSIT" => Ok(PaymentOption::JoiningDepositOnly),
            "JOINING_DEPOSIT_PLUS_CUSTOM" | "JOINING_DEPOSIT_CUSTOM" => {
                Ok(PaymentOption::JoiningDepositPlusCustom)
            }
            _ => Err(validation_error(
                "payment_option",
                format!("unknown payment option '{}'", s),
            )),
        }
    }
}

impl<'de> Deserialize<'de> for PaymentOption {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One labelled amount of a price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownLine {
    pub label: String,
    pub amount: Decimal,
}

/// Audit entry written on every extension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionRecord {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub previous_days: i64,
    pub days: i64,
    pub previous_payable: Decimal,
    pub payable: Decimal,
    pub extended_at: DateTime<Utc>,
}

/// Pricing as agreed at booking, updated in place by extensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    pub payment_option: PaymentOption,
    pub days: i64,
    pub rent_per_day: Decimal,
    pub joining_fee: Decimal,
    pub deposit: Decimal,
    pub usage: Decimal,
    pub custom_amount: Option<Decimal>,
    pub payable: Decimal,
    pub breakdown: Vec<BreakdownLine>,
    pub extended_to: Option<NaiveDate>,
    #[serde(default)]
    pub history: Vec<ExtensionRecord>,
}

impl PricingSnapshot {
    pub fn breakdown_total(&self) -> Decimal {
        self.breakdown.iter().map(|line| line.amount).sum()
    }
}

/// Rental record
#[derive(Debug, Clone, PartialEq)]
pub struct Rental {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub vehicle_id: Uuid,
    pub plan_id: Uuid,
    pub status: RentalStatus,
    pub start_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    /// Vehicle rate copied at booking time
    pub rate_per_day: Decimal,
    pub payable_total: Decimal,
    pub paid_total: Decimal,
    pub pricing: PricingSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rental {
    pub fn balance_due(&self) -> Decimal {
        self.payable_total - self.paid_total
    }

    /// Inclusive date-range overlap
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start <= self.expected_return_date
    }

    /// Move along the lifecycle graph, or fail with a conflict
    pub fn transition_to(&mut self, next: RentalStatus) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Rental {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Rental as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct RentalResponse {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub vehicle_id: Uuid,
    pub plan_id: Uuid,
    pub status: RentalStatus,
    pub start_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub rate_per_day: Decimal,
    pub payable_total: Decimal,
    pub paid_total: Decimal,
    pub balance_due: Decimal,
    pub pricing: PricingSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Rental> for RentalResponse {
    fn from(rental: Rental) -> Self {
        let balance_due = rental.balance_due();
        Self {
            id: rental.id,
            rider_id: rental.rider_id,
            vehicle_id: rental.vehicle_id,
            plan_id: rental.plan_id,
            status: rental.status,
            start_date: rental.start_date,
            expected_return_date: rental.expected_return_date,
            actual_return_date: rental.actual_return_date,
            rate_per_day: rental.rate_per_day,
            payable_total: rental.payable_total,
            paid_total: rental.paid_total,
            balance_due,
            pricing: rental.pricing,
            created_at: rental.created_at,
            updated_at: rental.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!("ongoing".parse::<RentalStatus>().unwrap(), RentalStatus::Ongoing);
        assert_eq!("ONGOING".parse::<RentalStatus>().unwrap(), RentalStatus::Ongoing);
        assert_eq!(
            "return-requested".parse::<RentalStatus>().unwrap(),
            RentalStatus::ReturnRequested
        );
        assert!("lost".parse::<RentalStatus>().is_err());
    }

    #[test]
    fn test_lifecycle_edges() {
        use RentalStatus::*;
        assert!(Booked.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(ReturnRequested));
        assert!(Ongoing.can_transition_to(ReturnRequested));
        assert!(ReturnRequested.can_transition_to(Returned));
        assert!(Returned.can_transition_to(Completed));

        assert!(!Booked.can_transition_to(Ongoing));
        assert!(!Ongoing.can_transition_to(Cancelled));
        assert!(!ReturnRequested.can_transition_to(ReturnRequested));
        assert!(!Returned.can_transition_to(ReturnRequested));
        assert!(!Completed.can_transition_to(Cancelled));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for status in [RentalStatus::Completed, RentalStatus::Cancelled] {
            assert!(status.is_terminal());
            assert!(RentalStatus::ALL.iter().all(|next| !status.can_transition_to(*next)));
        }
    }

    #[test]
    fn test_payment_option_parsing() {
        assert_eq!("FULL".parse::<PaymentOption>().unwrap(), PaymentOption::Full);
        assert_eq!(
            "joining_deposit".parse::<PaymentOption>().unwrap(),
            PaymentOption::JoiningDepositOnly
        );
        assert_eq!(
            "JOINING_DEPOSIT_PLUS_CUSTOM".parse::<PaymentOption>().unwrap(),
            PaymentOption::JoiningDepositPlusCustom
        );
        assert!("HALF".parse::<PaymentOption>().is_err());
    }
}
