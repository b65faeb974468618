use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::dto::rental_dto::{AvailabilityQuery, QuoteRequest};
use crate::dto::ApiResponse;
use crate::models::plan::Plan;
use crate::models::vehicle::{Vehicle, VehicleAvailability};
use crate::services::pricing_service::PricingResult;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Booking funnel: browse, check availability, price
pub fn create_public_router() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/vehicles", get(list_vehicles))
        .route("/vehicles/:id", get(get_vehicle))
        .route("/vehicles/:id/availability", get(vehicle_availability))
        .route("/quote", post(quote))
}

async fn list_plans(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Plan>>>, AppError> {
    let plans = state.catalog.list_plans().await?;
    Ok(Json(ApiResponse::success(plans)))
}

async fn list_vehicles(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Vehicle>>>, AppError> {
    let vehicles = state.catalog.list_vehicles().await?;
    Ok(Json(ApiResponse::success(vehicles)))
}

async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let vehicle = state.catalog.get_vehicle(id).await?;
    Ok(Json(ApiResponse::success(vehicle)))
}

async fn vehicle_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(range): Query<AvailabilityQuery>,
) -> Result<Json<ApiResponse<VehicleAvailability>>, AppError> {
    let availability = state
        .catalog
        .availability(id, range.start_date, range.end_date)
        .await?;
    Ok(Json(ApiResponse::success(availability)))
}

async fn quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<ApiResponse<PricingResult>>, AppError> {
    let quote = state.pricing.quote(request).await?;
    Ok(Json(ApiResponse::success(quote)))
}
