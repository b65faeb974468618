//! HTTP surface
//!
//! Routers per audience, nested under `/api`, plus the health probe and,
//! when `UPLOAD_PUBLIC_URL` is a path, the stored uploads themselves.

pub mod admin_routes;
pub mod auth_routes;
pub mod payment_routes;
pub mod public_routes;
pub mod rider_routes;
pub mod upload_routes;

use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::cors_layer;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(public_routes::create_public_router())
        .nest("/auth", auth_routes::create_auth_router(state.clone()))
        .nest("/rider", rider_routes::create_rider_router())
        .nest("/payments", payment_routes::create_payment_router())
        .nest("/admin", admin_routes::create_admin_router())
        .nest("/uploads", upload_routes::create_upload_router());

    let mut router = Router::new()
        .route("/health", get(health))
        .nest("/api", api);

    // An absolute UPLOAD_PUBLIC_URL points at an external static host
    let public_path = state.config.upload_public_url.trim_end_matches('/');
    if public_path.starts_with('/') && public_path.len() > 1 {
        router = router.nest_service(public_path, ServeDir::new(&state.config.upload_dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
