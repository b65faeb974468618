use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use crate::dto::admin_dto::{AlertRefreshRequest, RiderActivationRequest};
use crate::dto::rental_dto::{
    AvailabilityQuery, CompleteReturnRequest, CreateRentalRequest, OverrideStatusRequest,
    RentalListQuery,
};
use crate::dto::ApiResponse;
use crate::middleware::{AlertsCaller, AuthenticatedAdmin};
use crate::models::alert::AlertsSummary;
use crate::models::inventory::{AssignInventoryRequest, CreateInventoryRequest, InventoryItem};
use crate::models::plan::{Plan, PlanRequest};
use crate::models::rental::RentalResponse;
use crate::models::rider::RiderResponse;
use crate::models::vehicle::{
    CreateVehicleRequest, UpdateVehicleRequest, Vehicle, VehicleAvailability,
};
use crate::services::report_service::ReportSummary;
use crate::services::BookingActor;
use crate::state::AppState;
use crate::utils::errors::AppError;

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// Back-office. Every handler takes `AuthenticatedAdmin` except the alert
/// refresh, which also accepts the scheduler's cron key.
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans).post(create_plan))
        .route("/plans/:id", put(update_plan).delete(delete_plan))
        .route("/vehicles", get(list_vehicles).post(create_vehicle))
        .route("/vehicles/:id", put(update_vehicle))
        .route("/vehicles/:id/availability", get(vehicle_availability))
        .route("/riders", get(list_riders))
        .route("/riders/:id", get(get_rider))
        .route("/riders/:id/active", put(set_rider_active))
        .route("/rentals", get(list_rentals).post(create_rental))
        .route("/rentals/:id", get(get_rental))
        .route("/rentals/:id/start", post(start_rental))
        .route("/rentals/:id/complete-return", post(complete_return))
        .route("/rentals/:id/complete", post(complete_rental))
        .route("/rentals/:id/cancel", post(cancel_rental))
        .route("/rentals/:id/status", put(override_status))
        .route("/inventory", get(list_inventory).post(create_inventory))
        .route("/inventory/:id/assign", post(assign_inventory))
        .route("/inventory/:id/release", post(release_inventory))
        .route("/reports/summary", get(report_summary))
        .route("/alerts", get(alerts_summary))
        .route("/alerts/refresh", post(refresh_alerts))
}

// Plans

async fn list_plans(State(state): State<AppState>, _admin: AuthenticatedAdmin) -> ApiResult<Vec<Plan>> {
    Ok(Json(ApiResponse::success(state.catalog.list_plans().await?)))
}

async fn create_plan(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Json(request): Json<PlanRequest>,
) -> ApiResult<Plan> {
    let plan = state.catalog.create_plan(request).await?;
    Ok(Json(ApiResponse::success_with_message(plan, "Plan created")))
}

async fn update_plan(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
    Json(request): Json<PlanRequest>,
) -> ApiResult<Plan> {
    let plan = state.catalog.update_plan(id, request).await?;
    Ok(Json(ApiResponse::success_with_message(plan, "Plan updated")))
}

async fn delete_plan(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.catalog.delete_plan(id).await?;
    Ok(Json(ApiResponse::message("Plan deleted")))
}

// Vehicles

async fn list_vehicles(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
) -> ApiResult<Vec<Vehicle>> {
    Ok(Json(ApiResponse::success(state.catalog.list_vehicles().await?)))
}

async fn create_vehicle(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Json(request): Json<CreateVehicleRequest>,
) -> ApiResult<Vehicle> {
    let vehicle = state.catalog.create_vehicle(request).await?;
    Ok(Json(ApiResponse::success_with_message(vehicle, "Vehicle created")))
}

async fn update_vehicle(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVehicleRequest>,
) -> ApiResult<Vehicle> {
    let vehicle = state.catalog.update_vehicle(id, request).await?;
    Ok(Json(ApiResponse::success_with_message(vehicle, "Vehicle updated")))
}

async fn vehicle_availability(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
    Query(range): Query<AvailabilityQuery>,
) -> ApiResult<VehicleAvailability> {
    let availability = state
        .catalog
        .availability(id, range.start_date, range.end_date)
        .await?;
    Ok(Json(ApiResponse::success(availability)))
}

// Riders

async fn list_riders(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
) -> ApiResult<Vec<RiderResponse>> {
    Ok(Json(ApiResponse::success(state.riders.list().await?)))
}

async fn get_rider(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<RiderResponse> {
    Ok(Json(ApiResponse::success(state.riders.profile(id).await?)))
}

async fn set_rider_active(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
    Json(request): Json<RiderActivationRequest>,
) -> ApiResult<RiderResponse> {
    let rider = state.riders.set_active(id, request.active).await?;
    Ok(Json(ApiResponse::success(rider)))
}

// Rentals

async fn list_rentals(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Query(query): Query<RentalListQuery>,
) -> ApiResult<Vec<RentalResponse>> {
    let rentals = state.rentals.list(query.status.as_deref()).await?;
    Ok(Json(ApiResponse::success(
        rentals.into_iter().map(RentalResponse::from).collect(),
    )))
}

async fn create_rental(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Json(request): Json<CreateRentalRequest>,
) -> ApiResult<RentalResponse> {
    let rental = state.rentals.create(BookingActor::Admin, request).await?;
    info!(rental_id = %rental.id, admin = %admin.email, "🧾 Rental booked by staff");
    Ok(Json(ApiResponse::success_with_message(rental.into(), "Rental booked")))
}

async fn get_rental(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<RentalResponse> {
    Ok(Json(ApiResponse::success(state.rentals.get(id).await?.into())))
}

async fn start_rental(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<RentalResponse> {
    Ok(Json(ApiResponse::success(state.rentals.start(id).await?.into())))
}

async fn complete_return(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
    body: Option<Json<CompleteReturnRequest>>,
) -> ApiResult<RentalResponse> {
    let Json(request) = body.unwrap_or_default();
    let rental = state.rentals.complete_return(id, request.returned_on).await?;
    Ok(Json(ApiResponse::success(rental.into())))
}

async fn complete_rental(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<RentalResponse> {
    Ok(Json(ApiResponse::success(state.rentals.complete(id).await?.into())))
}

async fn cancel_rental(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<RentalResponse> {
    Ok(Json(ApiResponse::success(state.rentals.cancel(id).await?.into())))
}

async fn override_status(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
    Json(request): Json<OverrideStatusRequest>,
) -> ApiResult<RentalResponse> {
    let rental = state
        .rentals
        .override_status(id, &request.status, &admin.email, request.reason.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(rental.into())))
}

// Inventory

async fn list_inventory(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
) -> ApiResult<Vec<InventoryItem>> {
    Ok(Json(ApiResponse::success(state.inventory.list().await?)))
}

async fn create_inventory(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Json(request): Json<CreateInventoryRequest>,
) -> ApiResult<InventoryItem> {
    let item = state.inventory.create(request).await?;
    Ok(Json(ApiResponse::success_with_message(item, "Inventory item created")))
}

async fn assign_inventory(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignInventoryRequest>,
) -> ApiResult<InventoryItem> {
    Ok(Json(ApiResponse::success(state.inventory.assign(id, request).await?)))
}

async fn release_inventory(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<InventoryItem> {
    Ok(Json(ApiResponse::success(state.inventory.release(id).await?)))
}

// Reports and alerts

async fn report_summary(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
) -> ApiResult<ReportSummary> {
    Ok(Json(ApiResponse::success(state.reports.summary().await?)))
}

async fn alerts_summary(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
) -> ApiResult<AlertsSummary> {
    Ok(Json(ApiResponse::success(state.alerts.summary().await?)))
}

async fn refresh_alerts(
    State(state): State<AppState>,
    caller: AlertsCaller,
    body: Option<Json<AlertRefreshRequest>>,
) -> ApiResult<AlertsSummary> {
    let Json(request) = body.unwrap_or_default();
    if let AlertsCaller::Admin(admin) = &caller {
        info!(admin = %admin.email, "🔔 Manual alert refresh");
    }
    let summary = state
        .alerts
        .refresh(request.due_soon_days, request.starting_soon_days)
        .await?;
    Ok(Json(ApiResponse::success(summary)))
}
