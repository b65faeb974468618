//! Services module
//!
//! Business logic. Services depend on repository traits and the gateway
//! trait only, so every one of them runs against the in-memory store in
//! tests.

pub mod alert_service;
pub mod catalog_service;
pub mod inventory_service;
pub mod payment_service;
pub mod pricing_service;
pub mod rental_service;
pub mod report_service;
pub mod rider_service;
pub mod session_service;

pub use alert_service::AlertService;
pub use catalog_service::CatalogService;
pub use inventory_service::InventoryService;
pub use payment_service::PaymentService;
pub use pricing_service::PricingService;
pub use rental_service::{BookingActor, RentalService};
pub use report_service::ReportService;
pub use rider_service::{AdminCredentials, RiderService};
pub use session_service::SessionService;
