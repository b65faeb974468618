//! Payment gateway seam
//!
//! Amounts cross this boundary in minor units (paise). Implementations own
//! their wire format, including the webhook payload.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::payment::GatewayPaymentStatus;
use crate::utils::errors::AppResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayCustomer {
    pub id: String,
    pub email: String,
    pub phone: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayOrderRequest {
    pub order_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub customer: GatewayCustomer,
    pub return_url: Option<String>,
    pub notify_url: Option<String>,
}

/// Order as acknowledged by the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayOrder {
    pub order_id: String,
    /// Opaque handle the browser checkout is opened with
    pub session_handle: String,
}

/// One payment attempt against an order
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayPayment {
    pub order_id: String,
    pub reference: String,
    pub status: GatewayPaymentStatus,
    pub amount_minor: i64,
    pub completed_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: &GatewayOrderRequest) -> AppResult<GatewayOrder>;

    async fn fetch_order_payments(&self, order_id: &str) -> AppResult<Vec<GatewayPayment>>;

    fn verify_webhook_signature(&self, raw_body: &[u8], timestamp: &str, signature: &str) -> bool;

    /// Payment carried by an already-verified webhook body
    fn parse_webhook(&self, raw_body: &[u8]) -> AppResult<GatewayPayment>;
}

/// The attempt that decides an order's outcome: latest completion time,
/// attempts that never completed sort first
pub fn latest_payment(payments: &[GatewayPayment]) -> Option<&GatewayPayment> {
    payments.iter().max_by_key(|p| p.completed_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn attempt(reference: &str, completed_at: Option<DateTime<Utc>>) -> GatewayPayment {
        GatewayPayment {
            order_id: "RENT-1".to_string(),
            reference: reference.to_string(),
            status: GatewayPaymentStatus::Pending,
            amount_minor: 100,
            completed_at,
        }
    }

    #[test]
    fn test_latest_payment_prefers_newest_completion() {
        let early = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 1, 1, 11, 0, 0).unwrap();
        let payments = vec![
            attempt("a", Some(early)),
            attempt("b", None),
            attempt("c", Some(late)),
        ];

        assert_eq!(latest_payment(&payments).unwrap().reference, "c");
    }

    #[test]
    fn test_latest_payment_without_timestamps() {
        let payments = vec![attempt("only", None)];
        assert_eq!(latest_payment(&payments).unwrap().reference, "only");
        assert!(latest_payment(&[]).is_none());
    }
}
