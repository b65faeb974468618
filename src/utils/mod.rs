//! Shared utilities
//!
//! Errors, validation, JWT and money conversion.

pub mod errors;
pub mod jwt;
pub mod money;
pub mod validation;
