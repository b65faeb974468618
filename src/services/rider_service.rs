//! Rider accounts
//!
//! Registration, login, profile and KYC for riders, plus the single
//! configured back-office login.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::dto::auth_dto::{AdminLoginRequest, LoginRequest, SetPasswordRequest};
use crate::models::rider::{
    KycRequest, RegisterRiderRequest, Rider, RiderKyc, RiderResponse, UpdateProfileRequest,
};
use crate::repositories::RiderRepository;
use crate::services::session_service::{IssuedSession, SessionService};
use crate::utils::errors::{not_found_error, AppError, AppResult};
use crate::utils::jwt::SessionRole;
use crate::utils::validation::normalize_phone;

/// Admin credentials from configuration
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub email: String,
    pub password_hash: String,
}

/// Phone numbers are stored without the +91 prefix, emails lowercased
fn normalize_identifier(identifier: &str) -> String {
    let trimmed = identifier.trim();
    if trimmed.contains('@') {
        trimmed.to_lowercase()
    } else {
        normalize_phone(trimmed)
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".to_string())
}

pub struct RiderService {
    riders: Arc<dyn RiderRepository>,
    sessions: SessionService,
    admin: AdminCredentials,
    hash_cost: u32,
}

impl RiderService {
    pub fn new(
        riders: Arc<dyn RiderRepository>,
        sessions: SessionService,
        admin: AdminCredentials,
        hash_cost: u32,
    ) -> Self {
        Self {
            riders,
            sessions,
            admin,
            hash_cost,
        }
    }

    fn hash_password(&self, password: &str) -> AppResult<String> {
        bcrypt::hash(password, self.hash_cost).map_err(|e| AppError::Hash(e.to_string()))
    }

    fn issue_for(&self, rider: &Rider) -> AppResult<IssuedSession> {
        self.sessions
            .issue(&rider.id.to_string(), &rider.name, SessionRole::Rider)
    }

    /// Create the account and open a session for it
    pub async fn register(
        &self,
        request: RegisterRiderRequest,
    ) -> AppResult<(IssuedSession, RiderResponse)> {
        request.validate()?;

        let password_hash = match request.password.as_deref() {
            Some(password) => Some(self.hash_password(password)?),
            None => None,
        };

        let rider = self
            .riders
            .create(Rider {
                id: Uuid::new_v4(),
                name: request.name.trim().to_string(),
                phone: normalize_phone(&request.phone),
                email: request.email.trim().to_lowercase(),
                password_hash,
                is_active: true,
                created_at: Utc::now(),
                last_login_at: None,
            })
            .await?;

        info!(rider_id = %rider.id, "🆕 Rider registered");

        let session = self.issue_for(&rider)?;
        Ok((session, RiderResponse::from(rider)))
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<(IssuedSession, RiderResponse)> {
        request.validate()?;

        let rider = self
            .riders
            .find_by_login(&normalize_identifier(&request.identifier))
            .await?
            .ok_or_else(invalid_credentials)?;

        let Some(hash) = rider.password_hash.as_deref() else {
            return Err(AppError::Unauthorized(
                "No password set for this account".to_string(),
            ));
        };
        let matches =
            bcrypt::verify(&request.password, hash).map_err(|e| AppError::Hash(e.to_string()))?;
        if !matches {
            return Err(invalid_credentials());
        }
        if !rider.is_active {
            return Err(AppError::Forbidden("Account is deactivated".to_string()));
        }

        // Best effort, a failed stamp never blocks the login
        let now = Utc::now();
        if let Err(e) = self.riders.record_last_login(rider.id, now).await {
            warn!(rider_id = %rider.id, "⚠️ Could not record last login: {}", e);
        }

        info!(rider_id = %rider.id, "🔑 Rider logged in");

        let session = self.issue_for(&rider)?;
        let response = RiderResponse::from(Rider {
            last_login_at: Some(now),
            ..rider
        });
        Ok((session, response))
    }

    /// First password only; changing an existing one is a conflict
    pub async fn set_password(&self, rider_id: Uuid, request: SetPasswordRequest) -> AppResult<()> {
        request.validate()?;

        let hash = self.hash_password(&request.password)?;
        if !self.riders.set_password_if_unset(rider_id, hash).await? {
            return Err(AppError::Conflict("Password is already set".to_string()));
        }
        Ok(())
    }

    pub async fn admin_login(&self, request: AdminLoginRequest) -> AppResult<IssuedSession> {
        request.validate()?;

        if !request.email.trim().eq_ignore_ascii_case(&self.admin.email) {
            return Err(invalid_credentials());
        }
        let matches = bcrypt::verify(&request.password, &self.admin.password_hash)
            .map_err(|e| AppError::Hash(e.to_string()))?;
        if !matches {
            warn!("🚫 Failed admin login");
            return Err(invalid_credentials());
        }

        info!("🔑 Admin logged in");
        self.sessions
            .issue(&self.admin.email, "Administrator", SessionRole::Admin)
    }

    pub async fn profile(&self, rider_id: Uuid) -> AppResult<RiderResponse> {
        let (rider, kyc) = futures::try_join!(
            self.riders.find_by_id(rider_id),
            self.riders.find_kyc(rider_id)
        )?;
        let rider = rider.ok_or_else(|| not_found_error("Rider", rider_id))?;
        Ok(RiderResponse::new(rider, kyc))
    }

    pub async fn update_profile(
        &self,
        rider_id: Uuid,
        request: UpdateProfileRequest,
    ) -> AppResult<RiderResponse> {
        request.validate()?;

        let rider = self
            .riders
            .update_profile(
                rider_id,
                request.name.map(|name| name.trim().to_string()),
                request.email.map(|email| email.trim().to_lowercase()),
            )
            .await?;
        let kyc = self.riders.find_kyc(rider_id).await?;
        Ok(RiderResponse::new(rider, kyc))
    }

    /// Merge the submitted KYC fields into the stored record
    pub async fn update_kyc(&self, rider_id: Uuid, request: KycRequest) -> AppResult<RiderKyc> {
        request.validate()?;

        if self.riders.find_by_id(rider_id).await?.is_none() {
            return Err(not_found_error("Rider", rider_id));
        }

        let compact = |value: String| -> String {
            value
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_uppercase()
        };

        self.riders
            .upsert_kyc(RiderKyc {
                rider_id,
                aadhaar_number: request.aadhaar_number.map(compact),
                pan_number: request.pan_number.map(compact),
                dl_number: request.dl_number.map(compact),
                aadhaar_image_url: request.aadhaar_image_url,
                pan_image_url: request.pan_image_url,
                dl_image_url: request.dl_image_url,
                updated_at: Utc::now(),
            })
            .await
    }

    pub async fn list(&self) -> AppResult<Vec<RiderResponse>> {
        Ok(self
            .riders
            .list()
            .await?
            .into_iter()
            .map(RiderResponse::from)
            .collect())
    }

    pub async fn set_active(&self, rider_id: Uuid, active: bool) -> AppResult<RiderResponse> {
        let rider = self.riders.set_active(rider_id, active).await?;
        info!(rider_id = %rider_id, active, "👤 Rider activation changed");
        Ok(RiderResponse::from(rider))
    }
}
