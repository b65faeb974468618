//! Cashfree PG client
//!
//! REST client for the Cashfree payment gateway (API version 2023-08-01).
//! Only the three calls the payment service needs: create an order, list
//! the payments made against it, and check webhook signatures.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, RequestBuilder, Response};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use sha2::Sha256;

use crate::clients::payment_gateway::{
    GatewayOrder, GatewayOrderRequest, GatewayPayment, PaymentGateway,
};
use crate::config::environment::PaymentGatewayConfig;
use crate::models::payment::GatewayPaymentStatus;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::money::{from_minor_units, to_minor_units};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    order_id: &'a str,
    order_amount: Decimal,
    order_currency: &'a str,
    customer_details: CustomerDetails<'a>,
    order_meta: OrderMeta,
}

#[derive(Debug, Serialize)]
struct CustomerDetails<'a> {
    customer_id: &'a str,
    customer_email: &'a str,
    customer_phone: &'a str,
    customer_name: &'a str,
}

#[derive(Debug, Serialize)]
struct OrderMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    return_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notify_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    order_id: String,
    payment_session_id: String,
}

/// Entry of `GET /orders/{id}/payments`
#[derive(Debug, Deserialize)]
struct CashfreePayment {
    #[serde(deserialize_with = "string_or_number")]
    cf_payment_id: String,
    #[serde(default)]
    order_id: Option<String>,
    payment_status: String,
    payment_amount: Decimal,
    #[serde(default)]
    payment_completion_time: Option<DateTime<Utc>>,
    #[serde(default)]
    payment_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct WebhookBody {
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    order: WebhookOrder,
    payment: CashfreePayment,
}

#[derive(Debug, Deserialize)]
struct WebhookOrder {
    order_id: String,
}

/// Cashfree sends payment ids as numbers in some payloads and strings in others
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unexpected payment id: {}",
            other
        ))),
    }
}

impl CashfreePayment {
    fn into_gateway_payment(self, order_id: &str) -> AppResult<GatewayPayment> {
        let amount_minor = to_minor_units(self.payment_amount.round_dp(2))
            .map_err(|_| AppError::ExternalApi(format!(
                "Gateway returned an unusable amount {}",
                self.payment_amount
            )))?;

        Ok(GatewayPayment {
            order_id: self.order_id.unwrap_or_else(|| order_id.to_string()),
            reference: self.cf_payment_id,
            status: GatewayPaymentStatus::normalize(&self.payment_status),
            amount_minor,
            completed_at: self.payment_completion_time.or(self.payment_time),
        })
    }
}

pub struct CashfreeClient {
    client: Client,
    config: PaymentGatewayConfig,
}

impl CashfreeClient {
    pub fn new(config: PaymentGatewayConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("x-client-id", &self.config.app_id)
            .header("x-client-secret", &self.config.secret_key)
            .header("x-api-version", &self.config.api_version)
            .header("Accept", "application/json")
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, call: &str) -> AppResult<T> {
        let response: Response = request.send().await.map_err(|e| {
            log::error!("❌ Cashfree {} failed to send: {}", call, e);
            AppError::ExternalApi(format!("{}: {}", call, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("❌ Cashfree {} returned {}: {}", call, status, body);
            return Err(AppError::ExternalApi(format!("{} returned {}", call, status)));
        }

        response.json::<T>().await.map_err(|e| {
            log::error!("❌ Cashfree {} response not understood: {}", call, e);
            AppError::ExternalApi(format!("{}: invalid response: {}", call, e))
        })
    }
}

#[async_trait]
impl PaymentGateway for CashfreeClient {
    async fn create_order(&self, request: &GatewayOrderRequest) -> AppResult<GatewayOrder> {
        let body = CreateOrderBody {
            order_id: &request.order_id,
            order_amount: from_minor_units(request.amount_minor),
            order_currency: &request.currency,
            customer_details: CustomerDetails {
                customer_id: &request.customer.id,
                customer_email: &request.customer.email,
                customer_phone: &request.customer.phone,
                customer_name: &request.customer.name,
            },
            order_meta: OrderMeta {
                return_url: request.return_url.clone(),
                notify_url: request.notify_url.clone(),
            },
        };

        log::info!(
            "📡 Cashfree create order {} ({} paise)",
            request.order_id,
            request.amount_minor
        );

        let created: CreateOrderResponse = self
            .send(
                self.authorized(self.client.post(self.url("/orders"))).json(&body),
                "create order",
            )
            .await?;

        Ok(GatewayOrder {
            order_id: created.order_id,
            session_handle: created.payment_session_id,
        })
    }

    async fn fetch_order_payments(&self, order_id: &str) -> AppResult<Vec<GatewayPayment>> {
        log::info!("📡 Cashfree fetch payments for order {}", order_id);

        let payments: Vec<CashfreePayment> = self
            .send(
                self.authorized(
                    self.client
                        .get(self.url(&format!("/orders/{}/payments", order_id))),
                ),
                "fetch order payments",
            )
            .await?;

        payments
            .into_iter()
            .map(|p| p.into_gateway_payment(order_id))
            .collect()
    }

    fn verify_webhook_signature(&self, raw_body: &[u8], timestamp: &str, signature: &str) -> bool {
        let Ok(expected) = BASE64.decode(signature.trim()) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(self.config.webhook_secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.as_bytes());
        mac.update(raw_body);
        mac.verify_slice(&expected).is_ok()
    }

    fn parse_webhook(&self, raw_body: &[u8]) -> AppResult<GatewayPayment> {
        let body: WebhookBody = serde_json::from_slice(raw_body)
            .map_err(|e| AppError::BadRequest(format!("Malformed webhook payload: {}", e)))?;
        let order_id = body.data.order.order_id;
        body.data.payment.into_gateway_payment(&order_id)
    }
}

/// Signature the gateway would send for `raw_body`
pub fn sign_webhook(secret: &str, timestamp: &str, raw_body: &[u8]) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid webhook secret: {}", e)))?;
    mac.update(timestamp.as_bytes());
    mac.update(raw_body);
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}
