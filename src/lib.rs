//! Fleet rental backend
//!
//! Booking funnel, rider self-service and back-office API for a vehicle
//! rental fleet: pricing, rental lifecycle, payment reconciliation and
//! due-date alerts.

pub mod cache;
pub mod clients;
pub mod config;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use routes::create_router;
pub use state::AppState;
