//! Domain models
//!
//! Structs mapping the PostgreSQL schema plus the request and response
//! shapes built around them.

pub mod alert;
pub mod inventory;
pub mod payment;
pub mod plan;
pub mod rental;
pub mod rider;
pub mod vehicle;
