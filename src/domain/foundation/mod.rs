//! Foundation value objects and errors shared across the domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode};
pub use ids::UserId;
pub use timestamp::Timestamp;
