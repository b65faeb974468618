use axum::{
    extract::State,
    http::header::SET_COOKIE,
    middleware,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use crate::dto::auth_dto::{AdminLoginRequest, LoginRequest, LoginResponse, SetPasswordRequest};
use crate::dto::ApiResponse;
use crate::middleware::{rate_limit_middleware, AuthenticatedRider};
use crate::models::rider::RegisterRiderRequest;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Session issuance. Credential-checking routes are rate limited.
pub fn create_auth_router(state: AppState) -> Router<AppState> {
    let limited = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/admin/login", post(admin_login))
        .route_layer(middleware::from_fn_with_state(state, rate_limit_middleware));

    Router::new()
        .route("/logout", post(logout))
        .route("/set-password", post(set_password))
        .merge(limited)
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRiderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (session, rider) = state.riders.register(request).await?;
    Ok((
        [(SET_COOKIE, session.cookie)],
        Json(ApiResponse::success_with_message(
            LoginResponse::rider(session.token, rider),
            "Registration successful",
        )),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (session, rider) = state.riders.login(request).await?;
    Ok((
        [(SET_COOKIE, session.cookie)],
        Json(ApiResponse::success(LoginResponse::rider(session.token, rider))),
    ))
}

async fn admin_login(
    State(state): State<AppState>,
    Json(request): Json<AdminLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.riders.admin_login(request).await?;
    Ok((
        [(SET_COOKIE, session.cookie)],
        Json(ApiResponse::success(LoginResponse::admin(session.token))),
    ))
}

async fn logout(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let cleared = state.sessions.clear()?;
    Ok(([(SET_COOKIE, cleared)], Json(ApiResponse::message("Logged out"))))
}

async fn set_password(
    State(state): State<AppState>,
    rider: AuthenticatedRider,
    Json(request): Json<SetPasswordRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    state.riders.set_password(rider.rider_id, request).await?;
    Ok(Json(ApiResponse::message("Password set")))
}
