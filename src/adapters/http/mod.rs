//! HTTP adapters (axum routers and handlers).

pub mod billing;

pub use billing::{billing_router, BillingAppState};
