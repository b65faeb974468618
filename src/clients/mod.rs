//! Clients - HTTP clients for external APIs

pub mod cashfree_client;
pub mod payment_gateway;

pub use cashfree_client::CashfreeClient;
pub use payment_gateway::{
    GatewayCustomer, GatewayOrder, GatewayOrderRequest, GatewayPayment, PaymentGateway,
};
