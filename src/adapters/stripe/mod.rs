//! Stripe adapter for the payment provider port.

pub mod api_types;
pub mod stripe_adapter;

pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
