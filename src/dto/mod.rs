//! Request and response bodies of the HTTP API

pub mod admin_dto;
pub mod api_response;
pub mod auth_dto;
pub mod payment_dto;
pub mod rental_dto;

pub use api_response::ApiResponse;
