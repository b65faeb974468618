//! Rider model
//!
//! Riders, their KYC record and the requests that change them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::utils::validation::{
    validate_aadhaar, validate_driving_licence, validate_pan, validate_phone,
};

/// Rider row. `password_hash` stays `None` until the rider sets one.
#[derive(Debug, Clone, FromRow)]
pub struct Rider {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// KYC sub-record, one per rider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RiderKyc {
    pub rider_id: Uuid,
    pub aadhaar_number: Option<String>,
    pub pan_number: Option<String>,
    pub dl_number: Option<String>,
    pub aadhaar_image_url: Option<String>,
    pub pan_image_url: Option<String>,
    pub dl_image_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRiderRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,

    #[validate(custom = "validate_phone")]
    pub phone: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,

    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct KycRequest {
    #[validate(custom = "validate_aadhaar")]
    pub aadhaar_number: Option<String>,

    #[validate(custom = "validate_pan")]
    pub pan_number: Option<String>,

    #[validate(custom = "validate_driving_licence")]
    pub dl_number: Option<String>,

    #[validate(url)]
    pub aadhaar_image_url: Option<String>,

    #[validate(url)]
    pub pan_image_url: Option<String>,

    #[validate(url)]
    pub dl_image_url: Option<String>,
}

/// Rider as returned by the API, never carries the password hash
#[derive(Debug, Clone, Serialize)]
pub struct RiderResponse {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub is_active: bool,
    pub has_password: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kyc: Option<RiderKyc>,
}

impl RiderResponse {
    pub fn new(rider: Rider, kyc: Option<RiderKyc>) -> Self {
        Self {
            id: rider.id,
            name: rider.name,
            phone: rider.phone,
            email: rider.email,
            is_active: rider.is_active,
            has_password: rider.password_hash.is_some(),
            created_at: rider.created_at,
            last_login_at: rider.last_login_at,
            kyc,
        }
    }
}

impl From<Rider> for RiderResponse {
    fn from(rider: Rider) -> Self {
        Self::new(rider, None)
    }
}
