//! Middleware
//!
//! Identity extractors, CORS and rate limiting.

pub mod auth;
pub mod cors;
pub mod rate_limit;

pub use auth::{AlertsCaller, AuthenticatedAdmin, AuthenticatedRider};
pub use cors::cors_layer;
pub use rate_limit::{rate_limit_middleware, RateLimitState};
