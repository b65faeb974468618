use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

// Payment options and statuses arrive as strings and are parsed by the
// services, so an unknown value is reported against its field.

// Quote request (public)
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    pub plan_id: Uuid,
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub payment_option: String,
    pub custom_amount: Option<Decimal>,
}

// Booking request; `rider_id` is only read on the admin route
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRentalRequest {
    pub rider_id: Option<Uuid>,
    pub plan_id: Uuid,
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub payment_option: String,
    pub custom_amount: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtendRentalRequest {
    pub new_end_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteReturnRequest {
    pub returned_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverrideStatusRequest {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RentalListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}
