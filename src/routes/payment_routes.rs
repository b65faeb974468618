use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};

use crate::dto::payment_dto::{
    CreatePaymentOrderRequest, PaymentOrderResponse, VerifyPaymentResponse, WebhookAck,
};
use crate::dto::ApiResponse;
use crate::middleware::AuthenticatedRider;
use crate::services::payment_service::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_payment_router() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:order_id/verify", get(verify_order))
        .route("/webhook", post(webhook))
}

async fn create_order(
    State(state): State<AppState>,
    rider: AuthenticatedRider,
    Json(request): Json<CreatePaymentOrderRequest>,
) -> Result<Json<ApiResponse<PaymentOrderResponse>>, AppError> {
    let order = state.payments.create_order(rider.rider_id, request).await?;
    Ok(Json(ApiResponse::success(order)))
}

async fn verify_order(
    State(state): State<AppState>,
    rider: AuthenticatedRider,
    Path(order_id): Path<String>,
) -> Result<Json<ApiResponse<VerifyPaymentResponse>>, AppError> {
    let verified = state.payments.verify(&order_id, rider.rider_id).await?;
    Ok(Json(ApiResponse::success(verified)))
}

/// Gateway callback; the signature covers the raw body, so it is read as bytes
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let ack = state
        .payments
        .handle_webhook(
            &body,
            header_value(&headers, TIMESTAMP_HEADER),
            header_value(&headers, SIGNATURE_HEADER),
        )
        .await?;
    Ok(Json(ack))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
