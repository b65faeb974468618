use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::dto::ApiResponse;
use crate::middleware::{AuthenticatedAdmin, AuthenticatedRider};
use crate::state::AppState;
use crate::storage::upload_store::MAX_UPLOAD_BYTES;
use crate::utils::errors::{validation_error, AppError};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

pub fn create_upload_router() -> Router<AppState> {
    Router::new()
        .route("/", post(upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
}

/// Single `file` field; riders upload KYC scans, admins vehicle photos
async fn upload(
    State(state): State<AppState>,
    rider: Option<AuthenticatedRider>,
    admin: Option<AuthenticatedAdmin>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponse>>, AppError> {
    if rider.is_none() && admin.is_none() {
        return Err(AppError::Unauthorized("Authentication required".to_string()));
    }

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Could not read upload: {}", e)))?;

        let url = state.uploads.store_file(&bytes, &file_name).await?;
        return Ok(Json(ApiResponse::success(UploadResponse { url })));
    }

    Err(validation_error("file", "a `file` field is required"))
}
