//! Payment models
//!
//! Gateway orders created for a rental or a top-up, and the payments
//! reconciled against them.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Stored payment status - maps to the ENUM payment_status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Success,
    Failed,
    Pending,
}

/// Gateway status normalized to the local vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayPaymentStatus {
    Success,
    Failed,
    Pending,
    Unknown,
}

impl GatewayPaymentStatus {
    /// Map the gateway's status strings
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" | "PAID" | "CAPTURED" => GatewayPaymentStatus::Success,
            "FAILED" | "USER_DROPPED" | "CANCELLED" | "VOID" | "EXPIRED" | "TERMINATED" => {
                GatewayPaymentStatus::Failed
            }
            "PENDING" | "NOT_ATTEMPTED" | "ACTIVE" | "FLAGGED" => GatewayPaymentStatus::Pending,
            _ => GatewayPaymentStatus::Unknown,
        }
    }

    /// The stored status, if this one can be stored
    pub fn as_payment_status(&self) -> Option<PaymentStatus> {
        match self {
            GatewayPaymentStatus::Success => Some(PaymentStatus::Success),
            GatewayPaymentStatus::Failed => Some(PaymentStatus::Failed),
            GatewayPaymentStatus::Pending => Some(PaymentStatus::Pending),
            GatewayPaymentStatus::Unknown => None,
        }
    }
}

impl fmt::Display for GatewayPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GatewayPaymentStatus::Success => "SUCCESS",
            GatewayPaymentStatus::Failed => "FAILED",
            GatewayPaymentStatus::Pending => "PENDING",
            GatewayPaymentStatus::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// What an order pays for - maps to the ENUM payment_purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "payment_purpose", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentPurpose {
    Rental,
    TopUp,
}

impl PaymentPurpose {
    /// Prefix of generated order ids
    pub fn tag(&self) -> &'static str {
        match self {
            PaymentPurpose::Rental => "RENT",
            PaymentPurpose::TopUp => "TOPUP",
        }
    }
}

/// Local record of one gateway order
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct PaymentOrder {
    pub order_id: String,
    pub rider_id: Uuid,
    pub rental_id: Option<Uuid>,
    pub purpose: PaymentPurpose,
    /// Paise
    pub amount_minor: i64,
    pub session_handle: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Reconciled payment, unique per gateway payment reference
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub rental_id: Option<Uuid>,
    pub order_id: String,
    pub gateway_reference: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub transaction_at: DateTime<Utc>,
}

/// Outcome of recording a gateway payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// New payment row; `credited` when it moved money onto a rental
    Recorded { credited: bool },
    /// Pending/failed row upgraded to success and credited
    Upgraded,
    /// Already known in this or a later state
    Duplicate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_gateway_status() {
        assert_eq!(GatewayPaymentStatus::normalize("SUCCESS"), GatewayPaymentStatus::Success);
        assert_eq!(GatewayPaymentStatus::normalize("success"), GatewayPaymentStatus::Success);
        assert_eq!(GatewayPaymentStatus::normalize("USER_DROPPED"), GatewayPaymentStatus::Failed);
        assert_eq!(GatewayPaymentStatus::normalize("NOT_ATTEMPTED"), GatewayPaymentStatus::Pending);
        assert_eq!(GatewayPaymentStatus::normalize("MYSTERY"), GatewayPaymentStatus::Unknown);
        assert_eq!(GatewayPaymentStatus::Unknown.as_payment_status(), None);
    }
}
