//! Money helpers
//!
//! Amounts live as `Decimal` rupees in the domain and as `i64` paise at the
//! payment gateway seam.

use num_traits::ToPrimitive;
use rust_decimal::Decimal;

use crate::utils::errors::{validation_error, AppResult};

pub const CURRENCY: &str = "INR";
const MINOR_UNIT_SCALE: u32 = 2;

/// Largest amount a `NUMERIC(12,2)` column holds
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Paise precision and column range; `field` names the offending input
pub fn ensure_amount(field: &'static str, amount: Decimal) -> AppResult<Decimal> {
    if amount.normalize().scale() > MINOR_UNIT_SCALE {
        return Err(validation_error(
            field,
            format!("amount {} has more than two decimal places", amount),
        ));
    }
    if amount.abs() > MAX_AMOUNT {
        return Err(validation_error(
            field,
            format!("amount {} exceeds {}", amount, MAX_AMOUNT),
        ));
    }
    Ok(amount)
}

/// Sum of amounts, bounded like a single amount
pub fn checked_total<I>(field: &'static str, amounts: I) -> AppResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    let total = amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
        .ok_or_else(|| validation_error(field, "amount is out of range"))?;
    ensure_amount(field, total)
}

/// `rate` times `days`, bounded like a single amount
pub fn checked_usage(field: &'static str, rate: Decimal, days: i64) -> AppResult<Decimal> {
    let usage = rate
        .checked_mul(Decimal::from(days))
        .ok_or_else(|| validation_error(field, "amount is out of range"))?;
    ensure_amount(field, usage)
}

/// Rupees to paise. More than two decimal places is rejected, never rounded.
pub fn to_minor_units(amount: Decimal) -> AppResult<i64> {
    let normalized = amount.normalize();
    if normalized.scale() > MINOR_UNIT_SCALE {
        return Err(validation_error(
            "amount",
            format!("amount {} has more than two decimal places", amount),
        ));
    }

    normalized
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| minor.to_i64())
        .ok_or_else(|| validation_error("amount", format!("amount {} is out of range", amount)))
}

/// Paise to rupees
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, MINOR_UNIT_SCALE)
}
