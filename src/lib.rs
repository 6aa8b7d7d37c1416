//! Subhub - Subscription billing service
//!
//! Glue between the payment provider (Stripe), the local subscription
//! record store (PostgreSQL), and the notification channel (Resend).
//! The core of the service is the webhook reconciliation flow: verified
//! provider events are dispatched to per-category handlers that update
//! stored subscription records and queue templated emails.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
