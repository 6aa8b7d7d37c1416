//! Adapters implementing the ports against real infrastructure.

pub mod email;
pub mod http;
pub mod postgres;
pub mod stripe;
