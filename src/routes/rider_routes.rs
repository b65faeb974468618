use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::dto::rental_dto::{CreateRentalRequest, ExtendRentalRequest};
use crate::dto::ApiResponse;
use crate::middleware::AuthenticatedRider;
use crate::models::payment::Payment;
use crate::models::rental::RentalResponse;
use crate::models::rider::{KycRequest, RiderKyc, RiderResponse, UpdateProfileRequest};
use crate::services::BookingActor;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Rider self-service; every handler is scoped to the session's rider
pub fn create_rider_router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_profile).put(update_profile))
        .route("/kyc", put(update_kyc))
        .route("/rentals", get(list_rentals).post(create_rental))
        .route("/rentals/:id", get(get_rental))
        .route("/rentals/:id/extend", post(extend_rental))
        .route("/rentals/:id/return", post(request_return))
        .route("/payments", get(list_payments))
}

async fn get_profile(
    State(state): State<AppState>,
    rider: AuthenticatedRider,
) -> Result<Json<ApiResponse<RiderResponse>>, AppError> {
    let profile = state.riders.profile(rider.rider_id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

async fn update_profile(
    State(state): State<AppState>,
    rider: AuthenticatedRider,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<RiderResponse>>, AppError> {
    let profile = state.riders.update_profile(rider.rider_id, request).await?;
    Ok(Json(ApiResponse::success_with_message(profile, "Profile updated")))
}

async fn update_kyc(
    State(state): State<AppState>,
    rider: AuthenticatedRider,
    Json(request): Json<KycRequest>,
) -> Result<Json<ApiResponse<RiderKyc>>, AppError> {
    let kyc = state.riders.update_kyc(rider.rider_id, request).await?;
    Ok(Json(ApiResponse::success_with_message(kyc, "KYC details saved")))
}

async fn list_rentals(
    State(state): State<AppState>,
    rider: AuthenticatedRider,
) -> Result<Json<ApiResponse<Vec<RentalResponse>>>, AppError> {
    let rentals = state.rentals.list_for_rider(rider.rider_id).await?;
    Ok(Json(ApiResponse::success(
        rentals.into_iter().map(RentalResponse::from).collect(),
    )))
}

async fn get_rental(
    State(state): State<AppState>,
    rider: AuthenticatedRider,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RentalResponse>>, AppError> {
    let rental = state.rentals.get_for_rider(id, rider.rider_id).await?;
    Ok(Json(ApiResponse::success(rental.into())))
}

async fn create_rental(
    State(state): State<AppState>,
    rider: AuthenticatedRider,
    Json(request): Json<CreateRentalRequest>,
) -> Result<Json<ApiResponse<RentalResponse>>, AppError> {
    let rental = state
        .rentals
        .create(BookingActor::Rider(rider.rider_id), request)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        rental.into(),
        "Rental booked",
    )))
}

async fn extend_rental(
    State(state): State<AppState>,
    rider: AuthenticatedRider,
    Path(id): Path<Uuid>,
    Json(request): Json<ExtendRentalRequest>,
) -> Result<Json<ApiResponse<RentalResponse>>, AppError> {
    let rental = state
        .rentals
        .extend(id, rider.rider_id, request.new_end_date)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        rental.into(),
        "Rental extended",
    )))
}

async fn request_return(
    State(state): State<AppState>,
    rider: AuthenticatedRider,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RentalResponse>>, AppError> {
    let rental = state.rentals.request_return(id, rider.rider_id).await?;
    Ok(Json(ApiResponse::success_with_message(
        rental.into(),
        "Return requested",
    )))
}

async fn list_payments(
    State(state): State<AppState>,
    rider: AuthenticatedRider,
) -> Result<Json<ApiResponse<Vec<Payment>>>, AppError> {
    let payments = state.payments.list_for_rider(rider.rider_id).await?;
    Ok(Json(ApiResponse::success(payments)))
}
