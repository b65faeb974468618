//! Plan model
//!
//! A rental plan: the one-off fees charged on booking and the documents a
//! rider must provide. Maps to the `plans` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::utils::validation::validate_non_negative_amount;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub joining_fee: Decimal,
    pub security_deposit: Decimal,
    pub required_documents: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Request to create or replace a plan
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlanRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,

    #[validate(custom = "validate_non_negative_amount")]
    pub joining_fee: Decimal,

    #[validate(custom = "validate_non_negative_amount")]
    pub security_deposit: Decimal,

    #[serde(default)]
    pub required_documents: Vec<String>,
}

impl Plan {
    pub fn from_request(request: PlanRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: request.name,
            joining_fee: request.joining_fee,
            security_deposit: request.security_deposit,
            required_documents: request.required_documents,
            created_at: Utc::now(),
        }
    }
}
