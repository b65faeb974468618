use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::payment::{Payment, PaymentOrder, PaymentStatus, ReconcileOutcome};
use crate::repositories::PaymentRepository;
use crate::utils::errors::{map_unique_violation, AppResult};

const ORDER_COLUMNS: &str =
    "order_id, rider_id, rental_id, purpose, amount_minor, session_handle, status, created_at";
const PAYMENT_COLUMNS: &str =
    "id, rider_id, rental_id, order_id, gateway_reference, amount, status, transaction_at";

pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Move a successful payment onto its rental and close the order.
/// Returns whether a rental was credited.
async fn credit(tx: &mut Transaction<'_, Postgres>, payment: &Payment) -> AppResult<bool> {
    sqlx::query("UPDATE payment_orders SET status = 'SUCCESS' WHERE order_id = $1")
        .bind(&payment.order_id)
        .execute(&mut **tx)
        .await?;

    let Some(rental_id) = payment.rental_id else {
        return Ok(false);
    };

    let updated = sqlx::query(
        r#"
        UPDATE rentals
        SET paid_total = paid_total + $2,
            status = CASE WHEN status = 'BOOKED' THEN 'CONFIRMED'::rental_status ELSE status END,
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(rental_id)
    .bind(payment.amount)
    .execute(&mut **tx)
    .await?;

    Ok(updated.rows_affected() == 1)
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn create_order(&self, order: PaymentOrder) -> AppResult<PaymentOrder> {
        let order_id = order.order_id.clone();
        sqlx::query_as::<_, PaymentOrder>(&format!(
            r#"
            INSERT INTO payment_orders (
                order_id, rider_id, rental_id, purpose, amount_minor, session_handle, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(&order.order_id)
        .bind(order.rider_id)
        .bind(order.rental_id)
        .bind(order.purpose)
        .bind(order.amount_minor)
        .bind(&order.session_handle)
        .bind(order.status)
        .bind(order.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Payment order", "order_id", &order_id))
    }

    async fn find_order(&self, order_id: &str) -> AppResult<Option<PaymentOrder>> {
        let order = sqlx::query_as::<_, PaymentOrder>(&format!(
            "SELECT {} FROM payment_orders WHERE order_id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn record_gateway_payment(&self, payment: Payment) -> AppResult<ReconcileOutcome> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<(Uuid, PaymentStatus)> = sqlx::query_as(
            "SELECT id, status FROM payments WHERE gateway_reference = $1 FOR UPDATE",
        )
        .bind(&payment.gateway_reference)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match existing {
            None => {
                let inserted: Option<(Uuid,)> = sqlx::query_as(
                    r#"
                    INSERT INTO payments (
                        id, rider_id, rental_id, order_id, gateway_reference, amount, status, transaction_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    ON CONFLICT (gateway_reference) DO NOTHING
                    RETURNING id
                    "#,
                )
                .bind(payment.id)
                .bind(payment.rider_id)
                .bind(payment.rental_id)
                .bind(&payment.order_id)
                .bind(&payment.gateway_reference)
                .bind(payment.amount)
                .bind(payment.status)
                .bind(payment.transaction_at)
                .fetch_optional(&mut *tx)
                .await?;

                match inserted {
                    // Lost the race to a concurrent delivery of the same payment
                    None => ReconcileOutcome::Duplicate,
                    Some(_) if payment.status == PaymentStatus::Success => {
                        let credited = credit(&mut tx, &payment).await?;
                        ReconcileOutcome::Recorded { credited }
                    }
                    Some(_) => ReconcileOutcome::Recorded { credited: false },
                }
            }
            Some((id, current)) if current != PaymentStatus::Success => {
                sqlx::query(
                    "UPDATE payments SET status = $2, amount = $3, transaction_at = $4 WHERE id = $1",
                )
                .bind(id)
                .bind(payment.status)
                .bind(payment.amount)
                .bind(payment.transaction_at)
                .execute(&mut *tx)
                .await?;

                if payment.status == PaymentStatus::Success {
                    credit(&mut tx, &payment).await?;
                    ReconcileOutcome::Upgraded
                } else {
                    ReconcileOutcome::Duplicate
                }
            }
            Some(_) => ReconcileOutcome::Duplicate,
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn list_by_rider(&self, rider_id: Uuid) -> AppResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {} FROM payments WHERE rider_id = $1 ORDER BY transaction_at DESC",
            PAYMENT_COLUMNS
        ))
        .bind(rider_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }
}
