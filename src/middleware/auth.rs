//! Identity gate
//!
//! Extractors that turn the session cookie (or Bearer header) into an
//! explicit caller. Handlers that need a rider or an admin take one of these
//! as an argument; nothing is stored between requests.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::jwt::SessionRole;

pub const CRON_KEY_HEADER: &str = "x-cron-key";

type HmacSha256 = Hmac<Sha256>;

/// Both keys are MACed under the expected one; the tags compare in constant time
pub fn cron_key_matches(expected: &str, presented: &str) -> bool {
    let tag = |value: &str| {
        HmacSha256::new_from_slice(expected.as_bytes()).map(|mut mac| {
            mac.update(value.as_bytes());
            mac
        })
    };
    let (Ok(reference), Ok(candidate)) = (tag(expected), tag(presented)) else {
        return false;
    };
    candidate
        .verify_slice(&reference.finalize().into_bytes())
        .is_ok()
}

/// Logged-in rider
#[derive(Debug, Clone)]
pub struct AuthenticatedRider {
    pub rider_id: Uuid,
    pub name: String,
}

/// Logged-in back-office user
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin {
    pub email: String,
}

/// Caller allowed to refresh alerts: an admin, or the scheduler holding the cron key
#[derive(Debug, Clone)]
pub enum AlertsCaller {
    Admin(AuthenticatedAdmin),
    Scheduler,
}

fn session_required() -> AppError {
    AppError::Unauthorized("Authentication required".to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedRider {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = state
            .sessions
            .verify(&parts.headers)
            .ok_or_else(session_required)?;

        if claims.role != SessionRole::Rider {
            return Err(AppError::Forbidden("Rider session required".to_string()));
        }

        Ok(Self {
            rider_id: claims.rider_id()?,
            name: claims.name,
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = state
            .sessions
            .verify(&parts.headers)
            .ok_or_else(session_required)?;

        if claims.role != SessionRole::Admin {
            return Err(AppError::Forbidden("Administrator session required".to_string()));
        }

        Ok(Self { email: claims.sub })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AlertsCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(CRON_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        if let Some(presented) = presented {
            return match state.config.alerts_cron_key.as_deref() {
                Some(expected) if cron_key_matches(expected, presented) => {
                    Ok(AlertsCaller::Scheduler)
                }
                _ => Err(AppError::Unauthorized("Invalid cron key".to_string())),
            };
        }

        AuthenticatedAdmin::from_request_parts(parts, state)
            .await
            .map(AlertsCaller::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cron_key_matches() {
        assert!(cron_key_matches("test-cron-key", "test-cron-key"));
        assert!(!cron_key_matches("test-cron-key", "test-cron-kez"));
        assert!(!cron_key_matches("test-cron-key", "test-cron-key-longer"));
        assert!(!cron_key_matches("test-cron-key", ""));
    }
}
