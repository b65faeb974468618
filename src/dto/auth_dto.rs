use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::rider::RiderResponse;

// Login request; `identifier` is a phone number or an email
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 3, max = 254))]
    pub identifier: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SetPasswordRequest {
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AdminLoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

// Login response; the session itself travels in the cookie
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rider: Option<RiderResponse>,
}

impl LoginResponse {
    pub fn rider(token: String, rider: RiderResponse) -> Self {
        Self {
            token,
            rider: Some(rider),
        }
    }

    pub fn admin(token: String) -> Self {
        Self { token, rider: None }
    }
}
