//! HTTP adapter for the billing API.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::BillingAppState;
pub use routes::{billing_router, billing_routes, webhook_routes};
