//! PostgreSQL implementation of UserDirectory.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::{UserAccount, UserDirectory};

/// Reads user accounts from the application's `users` table.
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: Option<String>,
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, DomainError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, email, name FROM users WHERE lower(email) = lower($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("failed to query user by email: {}", e),
                    )
                })?;

        Ok(row.map(|row| UserAccount {
            id: UserId::from_uuid(row.id),
            email: row.email,
            name: row.name,
        }))
    }
}
