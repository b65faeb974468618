//! Validation helpers
//!
//! Custom validators used by the request DTOs (`#[validate(custom = "...")]`)
//! and by the services.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidationError;

use crate::utils::errors::{validation_error, AppResult};
use crate::utils::money::MAX_AMOUNT;

lazy_static! {
    static ref PHONE_RE: Regex = Regex::new(r"^(\+91)?[6-9][0-9]{9}$").unwrap();
    static ref AADHAAR_RE: Regex = Regex::new(r"^[2-9][0-9]{11}$").unwrap();
    static ref PAN_RE: Regex = Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap();
    static ref DL_RE: Regex = Regex::new(r"^[A-Z]{2}[0-9]{2}[ -]?[0-9]{4}[0-9]{7}$").unwrap();
}

/// Mobile number, optionally prefixed with +91
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    if !PHONE_RE.is_match(&compact) {
        let mut error = ValidationError::new("phone");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Aadhaar: 12 digits, first digit 2-9
pub fn validate_aadhaar(value: &str) -> Result<(), ValidationError> {
    let digits: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if !AADHAAR_RE.is_match(&digits) {
        let mut error = ValidationError::new("aadhaar");
        error.add_param("format".into(), &"12 digits".to_string());
        return Err(error);
    }
    Ok(())
}

pub fn validate_pan(value: &str) -> Result<(), ValidationError> {
    if !PAN_RE.is_match(&value.to_uppercase()) {
        let mut error = ValidationError::new("pan");
        error.add_param("format".into(), &"AAAAA9999A".to_string());
        return Err(error);
    }
    Ok(())
}

/// Driving licence: state code, RTO code, issue year, serial
pub fn validate_driving_licence(value: &str) -> Result<(), ValidationError> {
    if !DL_RE.is_match(&value.to_uppercase()) {
        let mut error = ValidationError::new("driving_licence");
        error.add_param("format".into(), &"SS00 YYYYNNNNNNN".to_string());
        return Err(error);
    }
    Ok(())
}

/// Paise precision and `NUMERIC(12,2)` range, shared by every money input
fn validate_money(value: &Decimal) -> Result<(), ValidationError> {
    if value.normalize().scale() > 2 {
        let mut error = ValidationError::new("money_scale");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    if value.abs() > MAX_AMOUNT {
        let mut error = ValidationError::new("money_range");
        error.add_param("max".into(), &MAX_AMOUNT.to_string());
        return Err(error);
    }
    Ok(())
}

pub fn validate_non_negative_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut error = ValidationError::new("non_negative");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    validate_money(value)
}

pub fn validate_positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut error = ValidationError::new("positive");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    validate_money(value)
}

/// End date must not precede start date
pub fn ensure_date_range(start: NaiveDate, end: NaiveDate) -> AppResult<()> {
    if end < start {
        return Err(validation_error(
            "end_date",
            format!("end date {} is before start date {}", end, start),
        ));
    }
    Ok(())
}

/// Strip spaces and the +91 prefix so phone lookups are stable
pub fn normalize_phone(value: &str) -> String {
    let compact: String = value.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    compact.strip_prefix("+91").map(str::to_string).unwrap_or(compact)
}
