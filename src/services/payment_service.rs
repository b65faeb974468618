//! Payment orchestration
//!
//! Opens gateway orders for rental balances and wallet top-ups, and folds
//! the gateway's answer back into the ledger. The browser return (verify)
//! and the server-to-server webhook both end in [`PaymentService::reconcile`],
//! which is idempotent on the gateway payment reference.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::payment_gateway::{
    latest_payment, GatewayCustomer, GatewayOrderRequest, GatewayPayment, PaymentGateway,
};
use crate::config::environment::PaymentGatewayConfig;
use crate::dto::payment_dto::{
    CreatePaymentOrderRequest, PaymentOrderResponse, VerifyPaymentResponse, WebhookAck,
};
use crate::models::payment::{
    GatewayPaymentStatus, Payment, PaymentOrder, PaymentPurpose, PaymentStatus, ReconcileOutcome,
};
use crate::models::rider::Rider;
use crate::repositories::{PaymentRepository, RentalRepository, RiderRepository};
use crate::utils::errors::{not_found_error, validation_error, AppError, AppResult};
use crate::utils::money::{ensure_amount, from_minor_units, to_minor_units, CURRENCY};
use crate::utils::validation::{normalize_phone, validate_phone};

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";
pub const TIMESTAMP_HEADER: &str = "x-webhook-timestamp";

/// `{TAG}-{subject}-{unix millis}`
pub fn generate_order_id(purpose: PaymentPurpose, subject: Uuid) -> String {
    format!(
        "{}-{}-{}",
        purpose.tag(),
        subject.simple(),
        Utc::now().timestamp_millis()
    )
}

/// Customer block for the gateway, checked before any call goes out
fn gateway_customer(rider: &Rider) -> AppResult<GatewayCustomer> {
    if rider.email.trim().is_empty() {
        return Err(validation_error("customer_email", "customer email is required"));
    }
    if rider.phone.trim().is_empty() {
        return Err(validation_error("customer_phone", "customer phone is required"));
    }
    validate_phone(&rider.phone)
        .map_err(|_| validation_error("customer_phone", "customer phone is not a valid mobile number"))?;

    Ok(GatewayCustomer {
        id: rider.id.simple().to_string(),
        email: rider.email.trim().to_string(),
        phone: normalize_phone(&rider.phone),
        name: rider.name.clone(),
    })
}

pub struct PaymentService {
    payments: Arc<dyn PaymentRepository>,
    rentals: Arc<dyn RentalRepository>,
    riders: Arc<dyn RiderRepository>,
    gateway: Arc<dyn PaymentGateway>,
    config: PaymentGatewayConfig,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        rentals: Arc<dyn RentalRepository>,
        riders: Arc<dyn RiderRepository>,
        gateway: Arc<dyn PaymentGateway>,
        config: PaymentGatewayConfig,
    ) -> Self {
        Self {
            payments,
            rentals,
            riders,
            gateway,
            config,
        }
    }

    pub async fn create_order(
        &self,
        rider_id: Uuid,
        request: CreatePaymentOrderRequest,
    ) -> AppResult<PaymentOrderResponse> {
        let rider = self
            .riders
            .find_by_id(rider_id)
            .await?
            .ok_or_else(|| not_found_error("Rider", rider_id))?;
        let customer = gateway_customer(&rider)?;

        let (rental_id, amount, subject) = match request.purpose {
            PaymentPurpose::Rental => {
                let rental_id = request
                    .rental_id
                    .ok_or_else(|| validation_error("rental_id", "rental_id is required"))?;
                let rental = self
                    .rentals
                    .find_by_id(rental_id)
                    .await?
                    .filter(|rental| rental.rider_id == rider_id)
                    .ok_or_else(|| not_found_error("Rental", rental_id))?;

                if rental.status.is_terminal() {
                    return Err(AppError::Conflict(format!(
                        "Rental {} is {} and cannot take payments",
                        rental.id, rental.status
                    )));
                }
                let balance = rental.balance_due();
                if balance <= Decimal::ZERO {
                    return Err(AppError::Conflict(format!(
                        "Rental {} has no balance due",
                        rental.id
                    )));
                }
                (Some(rental.id), balance, rental.id)
            }
            PaymentPurpose::TopUp => {
                let amount = request
                    .amount
                    .ok_or_else(|| validation_error("amount", "amount is required for a top-up"))?;
                if amount <= Decimal::ZERO {
                    return Err(validation_error("amount", "amount must be positive"));
                }
                (None, ensure_amount("amount", amount)?, rider.id)
            }
        };

        let amount_minor = to_minor_units(amount)?;
        let order_id = generate_order_id(request.purpose, subject);

        let gateway_order = self
            .gateway
            .create_order(&GatewayOrderRequest {
                order_id: order_id.clone(),
                amount_minor,
                currency: CURRENCY.to_string(),
                customer,
                return_url: Some(self.config.return_url.replace("{order_id}", &order_id)),
                notify_url: Some(self.config.notify_url.clone()),
            })
            .await?;

        let order = self
            .payments
            .create_order(PaymentOrder {
                order_id: order_id.clone(),
                rider_id,
                rental_id,
                purpose: request.purpose,
                amount_minor,
                session_handle: gateway_order.session_handle,
                status: PaymentStatus::Pending,
                created_at: Utc::now(),
            })
            .await?;

        info!(
            order_id = %order.order_id,
            rider_id = %rider_id,
            "💳 Payment order created for {} {}",
            from_minor_units(order.amount_minor),
            CURRENCY
        );

        Ok(PaymentOrderResponse {
            order_id: order.order_id,
            session_handle: order.session_handle,
            amount: from_minor_units(order.amount_minor),
        })
    }

    /// Ask the gateway how the order went and record the deciding attempt
    pub async fn verify(&self, order_id: &str, rider_id: Uuid) -> AppResult<VerifyPaymentResponse> {
        let order = self
            .payments
            .find_order(order_id)
            .await?
            .filter(|order| order.rider_id == rider_id)
            .ok_or_else(|| not_found_error("Payment order", order_id))?;

        let attempts = self.gateway.fetch_order_payments(&order.order_id).await?;
        let Some(latest) = latest_payment(&attempts) else {
            return Ok(VerifyPaymentResponse {
                order_id: order.order_id,
                status: GatewayPaymentStatus::Pending,
                captured_amount: Decimal::ZERO,
            });
        };

        self.reconcile(&order, latest).await?;

        let captured_amount = if latest.status == GatewayPaymentStatus::Success {
            from_minor_units(latest.amount_minor)
        } else {
            Decimal::ZERO
        };

        Ok(VerifyPaymentResponse {
            order_id: order.order_id,
            status: latest.status,
            captured_amount,
        })
    }

    /// Signed server-to-server notification; replays are absorbed
    pub async fn handle_webhook(
        &self,
        raw_body: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
    ) -> AppResult<WebhookAck> {
        let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
            return Err(AppError::Unauthorized(
                "Missing webhook signature headers".to_string(),
            ));
        };
        if !self
            .gateway
            .verify_webhook_signature(raw_body, timestamp, signature)
        {
            warn!("🚫 Webhook rejected: bad signature");
            return Err(AppError::Unauthorized(
                "Invalid webhook signature".to_string(),
            ));
        }

        let payment = self.gateway.parse_webhook(raw_body)?;
        let Some(order) = self.payments.find_order(&payment.order_id).await? else {
            warn!(order_id = %payment.order_id, "⚠️ Webhook for unknown order ignored");
            return Ok(WebhookAck {
                received: true,
                outcome: None,
            });
        };

        let outcome = self.reconcile(&order, &payment).await?;
        Ok(WebhookAck {
            received: true,
            outcome,
        })
    }

    /// Record one gateway attempt against its order. `None` when the status
    /// is one the ledger does not store.
    pub async fn reconcile(
        &self,
        order: &PaymentOrder,
        attempt: &GatewayPayment,
    ) -> AppResult<Option<ReconcileOutcome>> {
        let Some(status) = attempt.status.as_payment_status() else {
            warn!(
                order_id = %order.order_id,
                reference = %attempt.reference,
                "⚠️ Unrecognised gateway status, nothing recorded"
            );
            return Ok(None);
        };

        if attempt.amount_minor != order.amount_minor {
            warn!(
                order_id = %order.order_id,
                "⚠️ Gateway amount {} differs from order amount {}",
                attempt.amount_minor,
                order.amount_minor
            );
        }

        let outcome = self
            .payments
            .record_gateway_payment(Payment {
                id: Uuid::new_v4(),
                rider_id: order.rider_id,
                rental_id: order.rental_id,
                order_id: order.order_id.clone(),
                gateway_reference: attempt.reference.clone(),
                amount: from_minor_units(attempt.amount_minor),
                status,
                transaction_at: attempt.completed_at.unwrap_or_else(Utc::now),
            })
            .await?;

        match outcome {
            ReconcileOutcome::Duplicate => info!(
                order_id = %order.order_id,
                reference = %attempt.reference,
                "🔁 Payment already recorded"
            ),
            _ => info!(
                order_id = %order.order_id,
                reference = %attempt.reference,
                "✅ Payment {} recorded ({:?})",
                attempt.status,
                outcome
            ),
        }

        Ok(Some(outcome))
    }

    pub async fn list_for_rider(&self, rider_id: Uuid) -> AppResult<Vec<Payment>> {
        self.payments.list_by_rider(rider_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::cashfree_client::sign_webhook;
    use crate::clients::payment_gateway::GatewayOrder;
    use crate::config::environment::EnvironmentConfig;
    use crate::models::rental::RentalStatus;
    use crate::repositories::in_memory::fixtures::{date, rental, rider, vehicle};
    use crate::repositories::{InMemoryStore, VehicleRepository};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    const SECRET: &str = "test-webhook-secret";

    /// Gateway double: remembers orders, serves canned attempts, and reads
    /// webhook bodies as a bare JSON payment
    #[derive(Default)]
    struct StubGateway {
        orders: Mutex<Vec<GatewayOrderRequest>>,
        attempts: Mutex<Vec<GatewayPayment>>,
    }

    #[derive(serde::Deserialize)]
    struct StubWebhook {
        order_id: String,
        reference: String,
        status: String,
        amount_minor: i64,
    }

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn create_order(&self, request: &GatewayOrderRequest) -> AppResult<GatewayOrder> {
            self.orders.lock().unwrap().push(request.clone());
            Ok(GatewayOrder {
                order_id: request.order_id.clone(),
                session_handle: format!("session-{}", request.order_id),
            })
        }

        async fn fetch_order_payments(&self, _order_id: &str) -> AppResult<Vec<GatewayPayment>> {
            Ok(self.attempts.lock().unwrap().clone())
        }

        fn verify_webhook_signature(&self, raw_body: &[u8], timestamp: &str, signature: &str) -> bool {
            sign_webhook(SECRET, timestamp, raw_body).map_or(false, |s| s == signature)
        }

        fn parse_webhook(&self, raw_body: &[u8]) -> AppResult<GatewayPayment> {
            let body: StubWebhook = serde_json::from_slice(raw_body)?;
            Ok(GatewayPayment {
                order_id: body.order_id,
                reference: body.reference,
                status: GatewayPaymentStatus::normalize(&body.status),
                amount_minor: body.amount_minor,
                completed_at: Some(Utc::now()),
            })
        }
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        gateway: Arc<StubGateway>,
        service: PaymentService,
        rider_id: Uuid,
        rental_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(StubGateway::default());
        let rider = RiderRepository::create(store.as_ref(), rider("9876543210", "asha@example.com"))
            .await
            .unwrap();
        let vehicle = VehicleRepository::create(store.as_ref(), vehicle(dec!(50), 1, None))
            .await
            .unwrap();
        let rental = store
            .insert_if_available(rental(
                rider.id,
                vehicle.id,
                RentalStatus::Booked,
                date(2025, 1, 1),
                date(2025, 1, 5),
                dec!(2500),
            ))
            .await
            .unwrap();
        let service = PaymentService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            gateway.clone(),
            EnvironmentConfig::for_tests().payment_gateway,
        );
        Fixture {
            store,
            gateway,
            service,
            rider_id: rider.id,
            rental_id: rental.id,
        }
    }

    fn rental_order(f: &Fixture) -> CreatePaymentOrderRequest {
        CreatePaymentOrderRequest {
            purpose: PaymentPurpose::Rental,
            rental_id: Some(f.rental_id),
            amount: Some(dec!(1)),
        }
    }

    fn webhook_body(order_id: &str, reference: &str, status: &str, amount_minor: i64) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "order_id": order_id,
            "reference": reference,
            "status": status,
            "amount_minor": amount_minor,
        }))
        .unwrap()
    }

    async fn deliver(f: &Fixture, body: &[u8]) -> AppResult<WebhookAck> {
        let signature = sign_webhook(SECRET, "1700000000", body).unwrap();
        f.service
            .handle_webhook(body, Some("1700000000"), Some(&signature))
            .await
    }

    #[tokio::test]
    async fn test_rental_order_uses_server_balance() {
        let f = fixture().await;
        let order = f.service.create_order(f.rider_id, rental_order(&f)).await.unwrap();

        assert_eq!(order.amount, dec!(2500));
        assert!(order.order_id.starts_with("RENT-"));
        assert_eq!(order.order_id.split('-').count(), 3);

        let sent = f.gateway.orders.lock().unwrap();
        assert_eq!(sent[0].amount_minor, 250_000);
        assert_eq!(sent[0].currency, "INR");
        assert!(sent[0].return_url.as_deref().unwrap().contains(&order.order_id));
        assert!(sent[0].notify_url.is_some());
    }

    #[tokio::test]
    async fn test_order_for_settled_rental_conflicts() {
        let f = fixture().await;
        f.store
            .update_atomically(f.rental_id, None, &|mut r| {
                r.paid_total = r.payable_total;
                Ok(r)
            })
            .await
            .unwrap();

        let result = f.service.create_order(f.rider_id, rental_order(&f)).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(f.gateway.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_for_someone_elses_rental_is_not_found() {
        let f = fixture().await;
        let other = RiderRepository::create(f.store.as_ref(), rider("9000000003", "other@example.com"))
            .await
            .unwrap();

        let result = f.service.create_order(other.id, rental_order(&f)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_customer_phone_never_reaches_gateway() {
        let f = fixture().await;
        let bad = RiderRepository::create(f.store.as_ref(), rider("12345", "bad@example.com"))
            .await
            .unwrap();

        let result = f
            .service
            .create_order(
                bad.id,
                CreatePaymentOrderRequest {
                    purpose: PaymentPurpose::TopUp,
                    rental_id: None,
                    amount: Some(dec!(100)),
                },
            )
            .await;

        match result {
            Err(AppError::Validation(errors)) => {
                assert!(errors.field_errors().contains_key("customer_phone"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(f.gateway.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_top_up_requires_positive_amount() {
        let f = fixture().await;
        let result = f
            .service
            .create_order(
                f.rider_id,
                CreatePaymentOrderRequest {
                    purpose: PaymentPurpose::TopUp,
                    rental_id: None,
                    amount: Some(dec!(0)),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let order = f
            .service
            .create_order(
                f.rider_id,
                CreatePaymentOrderRequest {
                    purpose: PaymentPurpose::TopUp,
                    rental_id: None,
                    amount: Some(dec!(150.25)),
                },
            )
            .await
            .unwrap();
        assert!(order.order_id.starts_with("TOPUP-"));
        assert_eq!(order.amount, dec!(150.25));
    }

    #[tokio::test]
    async fn test_top_up_amount_outside_paise_range_is_field_error() {
        let f = fixture().await;
        for amount in [Decimal::MAX / dec!(10), dec!(10000000000), dec!(10.005)] {
            let result = f
                .service
                .create_order(
                    f.rider_id,
                    CreatePaymentOrderRequest {
                        purpose: PaymentPurpose::TopUp,
                        rental_id: None,
                        amount: Some(amount),
                    },
                )
                .await;

            match result {
                Err(AppError::Validation(errors)) => {
                    assert!(errors.field_errors().contains_key("amount"))
                }
                other => panic!("unexpected result for {}: {:?}", amount, other),
            }
        }
        assert!(f.gateway.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_webhook_replay_credits_once() {
        let f = fixture().await;
        let order = f.service.create_order(f.rider_id, rental_order(&f)).await.unwrap();
        let body = webhook_body(&order.order_id, "cf-900", "SUCCESS", 250_000);

        let first = deliver(&f, &body).await.unwrap();
        assert_eq!(first.outcome, Some(ReconcileOutcome::Recorded { credited: true }));
        let second = deliver(&f, &body).await.unwrap();
        assert_eq!(second.outcome, Some(ReconcileOutcome::Duplicate));

        let stored = f.store.find_by_id_rental(f.rental_id).await;
        assert_eq!(stored.paid_total, dec!(2500));
        assert_eq!(stored.balance_due(), dec!(0));
        assert_eq!(stored.status, RentalStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_webhook_signature_is_mandatory() {
        let f = fixture().await;
        let body = webhook_body("RENT-x-1", "cf-1", "SUCCESS", 100);

        let missing = f.service.handle_webhook(&body, None, None).await;
        assert!(matches!(missing, Err(AppError::Unauthorized(_))));

        let forged = f
            .service
            .handle_webhook(&body, Some("1700000000"), Some("Zm9yZ2Vk"))
            .await;
        assert!(matches!(forged, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_verify_picks_latest_attempt() {
        let f = fixture().await;
        let order = f.service.create_order(f.rider_id, rental_order(&f)).await.unwrap();
        let now = Utc::now();
        *f.gateway.attempts.lock().unwrap() = vec![
            GatewayPayment {
                order_id: order.order_id.clone(),
                reference: "cf-late".to_string(),
                status: GatewayPaymentStatus::Success,
                amount_minor: 250_000,
                completed_at: Some(now),
            },
            GatewayPayment {
                order_id: order.order_id.clone(),
                reference: "cf-early".to_string(),
                status: GatewayPaymentStatus::Failed,
                amount_minor: 250_000,
                completed_at: Some(now - chrono::Duration::minutes(5)),
            },
        ];

        let verified = f.service.verify(&order.order_id, f.rider_id).await.unwrap();
        assert_eq!(verified.status, GatewayPaymentStatus::Success);
        assert_eq!(verified.captured_amount, dec!(2500));

        // Browser return and webhook for the same attempt credit once
        let body = webhook_body(&order.order_id, "cf-late", "SUCCESS", 250_000);
        let ack = deliver(&f, &body).await.unwrap();
        assert_eq!(ack.outcome, Some(ReconcileOutcome::Duplicate));
        assert_eq!(f.store.find_by_id_rental(f.rental_id).await.paid_total, dec!(2500));

        let stranger = f.service.verify(&order.order_id, Uuid::new_v4()).await;
        assert!(matches!(stranger, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_status_is_not_recorded() {
        let f = fixture().await;
        let order = f.service.create_order(f.rider_id, rental_order(&f)).await.unwrap();
        let body = webhook_body(&order.order_id, "cf-weird", "MYSTERY", 250_000);

        let ack = deliver(&f, &body).await.unwrap();
        assert_eq!(ack.outcome, None);
        assert!(f.service.list_for_rider(f.rider_id).await.unwrap().is_empty());
    }

    impl InMemoryStore {
        async fn find_by_id_rental(&self, id: Uuid) -> crate::models::rental::Rental {
            RentalRepository::find_by_id(self, id).await.unwrap().unwrap()
        }
    }
}
