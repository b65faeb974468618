//! Session gate
//!
//! Sessions are signed JWTs carried in the `rider_session` cookie or a
//! Bearer header. Nothing is kept server-side; verification only needs the
//! request headers and the configured secret.

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::Duration;

use crate::config::environment::EnvironmentConfig;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::jwt::{
    extract_token_from_header, generate_token, verify_token, JwtConfig, SessionClaims, SessionRole,
};

pub const SESSION_COOKIE: &str = "rider_session";

/// Newly issued session: the raw token and the matching `Set-Cookie` value
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub cookie: HeaderValue,
}

#[derive(Debug, Clone)]
pub struct SessionService {
    jwt: JwtConfig,
    secure_cookie: bool,
}

impl SessionService {
    pub fn new(jwt: JwtConfig, secure_cookie: bool) -> Self {
        Self { jwt, secure_cookie }
    }

    pub fn from_config(config: &EnvironmentConfig) -> Self {
        Self::new(JwtConfig::from(config), !config.is_development())
    }

    pub fn issue(&self, subject: &str, name: &str, role: SessionRole) -> AppResult<IssuedSession> {
        let token = generate_token(subject, name, role, &self.jwt)?;
        let cookie = self.cookie(&token, self.jwt.ttl)?;
        Ok(IssuedSession { token, cookie })
    }

    /// Claims of a valid session, from the cookie first, then the Bearer header
    pub fn verify(&self, headers: &HeaderMap) -> Option<SessionClaims> {
        let token = cookie_value(headers, SESSION_COOKIE).or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(extract_token_from_header)
                .map(str::to_string)
        })?;

        match verify_token(&token, &self.jwt) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::debug!("Session rejected: {}", e);
                None
            }
        }
    }

    /// `Set-Cookie` value that expires the session cookie
    pub fn clear(&self) -> AppResult<HeaderValue> {
        self.cookie("", Duration::zero())
    }

    fn cookie(&self, token: &str, max_age: Duration) -> AppResult<HeaderValue> {
        let mut cookie = format!(
            "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
            SESSION_COOKIE,
            token,
            max_age.num_seconds().max(0)
        );
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
            .map_err(|e| AppError::Internal(format!("Invalid session cookie: {}", e)))
    }
}

/// Value of a named cookie from the `Cookie` header(s)
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
