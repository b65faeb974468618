//! Pricing engine
//!
//! Turns a plan, a daily rate, a date range and a payment option into the
//! amount payable up front with a labelled breakdown. Pure apart from the
//! plan/vehicle lookup in [`PricingService::quote`].

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::dto::rental_dto::QuoteRequest;
use crate::models::plan::Plan;
use crate::models::rental::{BreakdownLine, PaymentOption, PricingSnapshot};
use crate::repositories::{PlanRepository, VehicleRepository};
use crate::utils::errors::{not_found_error, validation_error, AppResult};
use crate::utils::money::{checked_total, checked_usage, ensure_amount};
use crate::utils::validation::ensure_date_range;

/// Result of pricing a date range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingResult {
    pub payment_option: PaymentOption,
    pub days: i64,
    pub rent_per_day: Decimal,
    pub joining_fee: Decimal,
    pub deposit: Decimal,
    pub usage: Decimal,
    pub custom_amount: Option<Decimal>,
    pub payable: Decimal,
    pub breakdown: Vec<BreakdownLine>,
}

impl PricingResult {
    pub fn into_snapshot(self) -> PricingSnapshot {
        PricingSnapshot {
            payment_option: self.payment_option,
            days: self.days,
            rent_per_day: self.rent_per_day,
            joining_fee: self.joining_fee,
            deposit: self.deposit,
            usage: self.usage,
            custom_amount: self.custom_amount,
            payable: self.payable,
            breakdown: self.breakdown,
            extended_to: None,
            history: Vec::new(),
        }
    }
}

/// Billable days, counting both endpoints, never less than one
pub fn rental_days(start: NaiveDate, end: NaiveDate) -> AppResult<i64> {
    ensure_date_range(start, end)?;
    Ok((end.signed_duration_since(start).num_days() + 1).max(1))
}

pub fn usage_label(days: i64, rate: Decimal) -> String {
    format!("Rent ({} days x {})", days, rate)
}

pub fn calculate_quote(
    plan: &Plan,
    rent_per_day: Decimal,
    start: NaiveDate,
    end: NaiveDate,
    payment_option: PaymentOption,
    custom_amount: Option<Decimal>,
) -> AppResult<PricingResult> {
    let days = rental_days(start, end)?;
    ensure_amount("rent_per_day", rent_per_day)?;
    let usage = checked_usage("rent_per_day", rent_per_day, days)?;

    let mut breakdown = vec![
        BreakdownLine {
            label: "Joining fee".to_string(),
            amount: plan.joining_fee,
        },
        BreakdownLine {
            label: "Security deposit".to_string(),
            amount: plan.security_deposit,
        },
    ];

    let custom_amount = match payment_option {
        PaymentOption::Full => {
            breakdown.push(BreakdownLine {
                label: usage_label(days, rent_per_day),
                amount: usage,
            });
            None
        }
        PaymentOption::JoiningDepositOnly => None,
        PaymentOption::JoiningDepositPlusCustom => {
            let custom = custom_amount.ok_or_else(|| {
                validation_error("custom_amount", "custom amount is required for this option")
            })?;
            if custom.is_sign_negative() {
                return Err(validation_error(
                    "custom_amount",
                    "custom amount cannot be negative",
                ));
            }
            ensure_amount("custom_amount", custom)?;
            breakdown.push(BreakdownLine {
                label: "Custom amount".to_string(),
                amount: custom,
            });
            Some(custom)
        }
    };

    let payable = checked_total("payable", breakdown.iter().map(|line| line.amount))?;

    Ok(PricingResult {
        payment_option,
        days,
        rent_per_day,
        joining_fee: plan.joining_fee,
        deposit: plan.security_deposit,
        usage,
        custom_amount,
        payable,
        breakdown,
    })
}

pub struct PricingService {
    plans: Arc<dyn PlanRepository>,
    vehicles: Arc<dyn VehicleRepository>,
}

impl PricingService {
    pub fn new(plans: Arc<dyn PlanRepository>, vehicles: Arc<dyn VehicleRepository>) -> Self {
        Self { plans, vehicles }
    }

    /// Advisory quote at the vehicle's current rate
    pub async fn quote(&self, request: QuoteRequest) -> AppResult<PricingResult> {
        let payment_option: PaymentOption = request.payment_option.parse()?;
        ensure_date_range(request.start_date, request.end_date)?;

        let (plan, vehicle) = futures::try_join!(
            self.plans.find_by_id(request.plan_id),
            self.vehicles.find_by_id(request.vehicle_id)
        )?;
        let plan = plan.ok_or_else(|| not_found_error("Plan", request.plan_id))?;
        let vehicle = vehicle.ok_or_else(|| not_found_error("Vehicle", request.vehicle_id))?;

        calculate_quote(
            &plan,
            vehicle.rent_per_day,
            request.start_date,
            request.end_date,
            payment_option,
            request.custom_amount,
        )
    }
}
