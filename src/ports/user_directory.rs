//! UserDirectory port - lookup of user accounts owned by the surrounding
//! application.
//!
//! Billing never creates or mutates users; it only resolves the email
//! addresses carried on provider events to internal user ids.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};

/// A user account as billing sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
}

/// Port for resolving user accounts.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a user by email, case-insensitively.
    ///
    /// Returns `None` when no account matches; webhook handlers treat that
    /// as a silent skip, not an error.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, DomainError>;
}
