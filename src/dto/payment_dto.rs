use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::payment::{GatewayPaymentStatus, PaymentPurpose, ReconcileOutcome};

// Order request; rental orders are always priced server-side
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentOrderRequest {
    pub purpose: PaymentPurpose,
    pub rental_id: Option<Uuid>,
    /// Top-ups only
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentOrderResponse {
    pub order_id: String,
    pub session_handle: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifyPaymentResponse {
    pub order_id: String,
    pub status: GatewayPaymentStatus,
    pub captured_amount: Decimal,
}

// Webhook acknowledgement; `outcome` is absent when nothing was recorded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: Option<ReconcileOutcome>,
}
