//! JWT helpers
//!
//! Signing and verification of the session token carried in the rider
//! cookie or in a Bearer header.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::environment::EnvironmentConfig, utils::errors::AppError};

/// Who the session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionRole {
    Rider,
    Admin,
}

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // rider id, or the admin email
    pub name: String,
    pub role: SessionRole,
    pub exp: usize,
    pub iat: usize,
}

impl SessionClaims {
    pub fn rider_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Jwt("Invalid subject in token".to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl: Duration,
}

impl From<&EnvironmentConfig> for JwtConfig {
    fn from(config: &EnvironmentConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            ttl: Duration::days(config.session_ttl_days),
        }
    }
}

pub fn generate_token(
    subject: &str,
    name: &str,
    role: SessionRole,
    config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = now + config.ttl;

    let claims = SessionClaims {
        sub: subject.to_string(),
        name: name.to_string(),
        role,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    let encoding_key = EncodingKey::from_secret(config.secret.as_ref());

    encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| AppError::Jwt(format!("Error generating token: {}", e)))
}

/// Verify signature and expiry
pub fn verify_token(token: &str, config: &JwtConfig) -> Result<SessionClaims, AppError> {
    let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

    let token_data = decode::<SessionClaims>(token, &decoding_key, &Validation::default())
        .map_err(|e| AppError::Jwt(format!("Invalid token: {}", e)))?;

    Ok(token_data.claims)
}

/// Token from an `Authorization: Bearer ...` header value
pub fn extract_token_from_header(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            ttl: Duration::days(30),
        }
    }

    #[test]
    fn test_generate_and_verify_token() {
        let rider_id = Uuid::new_v4();
        let token = generate_token(&rider_id.to_string(), "Asha", SessionRole::Rider, &config()).unwrap();

        let claims = verify_token(&token, &config()).unwrap();
        assert_eq!(claims.rider_id().unwrap(), rider_id);
        assert_eq!(claims.name, "Asha");
        assert_eq!(claims.role, SessionRole::Rider);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = generate_token("x", "x", SessionRole::Admin, &config()).unwrap();
        let other = JwtConfig {
            secret: "other".to_string(),
            ttl: Duration::days(30),
        };
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let expired = JwtConfig {
            secret: "test-secret".to_string(),
            ttl: Duration::days(-1),
        };
        let token = generate_token("x", "x", SessionRole::Rider, &expired).unwrap();
        assert!(verify_token(&token, &config()).is_err());
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(extract_token_from_header("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_token_from_header("Basic abc"), None);
        assert_eq!(extract_token_from_header("Bearer "), None);
    }
}
