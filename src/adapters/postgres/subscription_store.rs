//! PostgreSQL implementation of SubscriptionStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{
    LatestInvoice, Recurrency, SubscriptionPatch, SubscriptionRecord, SubscriptionStatus,
};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::SubscriptionStore;

/// PostgreSQL implementation of the SubscriptionStore port.
///
/// `customer` and `latest_invoice` are JSONB; payment-intent correlation goes
/// through an expression index on `latest_invoice->'payment_intent'->>'id'`.
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    subscription_id: String,
    schedule_id: Option<String>,
    user_id: Uuid,
    subscription_start: i64,
    subscription_end: i64,
    currency: String,
    price_id: String,
    recurrency: String,
    customer: serde_json::Value,
    latest_invoice: serde_json::Value,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let recurrency = Recurrency::parse(&row.recurrency).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("invalid recurrency value: {}", row.recurrency),
            )
        })?;

        let latest_invoice: LatestInvoice = serde_json::from_value(row.latest_invoice)
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("invalid latest_invoice json: {}", e),
                )
            })?;

        Ok(SubscriptionRecord {
            subscription_id: row.subscription_id,
            schedule_id: row.schedule_id,
            user_id: UserId::from_uuid(row.user_id),
            subscription_start: row.subscription_start,
            subscription_end: row.subscription_end,
            currency: row.currency,
            price_id: row.price_id,
            recurrency,
            customer: row.customer,
            latest_invoice,
            status: SubscriptionStatus::parse(&row.status),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn db_err(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

const SELECT_COLUMNS: &str = r#"
    subscription_id, schedule_id, user_id, subscription_start, subscription_end,
    currency, price_id, recurrency, customer, latest_invoice, status,
    created_at, updated_at
"#;

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn create(&self, record: SubscriptionRecord) -> Result<(), DomainError> {
        let latest_invoice = serde_json::to_value(&record.latest_invoice)
            .map_err(|e| DomainError::new(ErrorCode::InternalError, e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                subscription_id, schedule_id, user_id, subscription_start,
                subscription_end, currency, price_id, recurrency, customer,
                latest_invoice, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(&record.subscription_id)
        .bind(&record.schedule_id)
        .bind(record.user_id.as_uuid())
        .bind(record.subscription_start)
        .bind(record.subscription_end)
        .bind(&record.currency)
        .bind(&record.price_id)
        .bind(record.recurrency.as_str())
        .bind(&record.customer)
        .bind(&latest_invoice)
        .bind(record.status.as_str())
        .bind(record.created_at.as_datetime())
        .bind(record.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.constraint() == Some("subscriptions_pkey") {
                    return DomainError::new(
                        ErrorCode::ValidationFailed,
                        format!("subscription {} already exists", record.subscription_id),
                    );
                }
            }
            db_err("failed to insert subscription", e)
        })?;

        Ok(())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<SubscriptionRecord>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("failed to query subscriptions by user", e))?;

        rows.into_iter().map(SubscriptionRecord::try_from).collect()
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE subscription_id = $1",
            SELECT_COLUMNS
        ))
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("failed to query subscription", e))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            r#"SELECT {} FROM subscriptions
               WHERE latest_invoice->'payment_intent'->>'id' = $1"#,
            SELECT_COLUMNS
        ))
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("failed to query subscription by payment intent", e))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn update(
        &self,
        subscription_id: &str,
        patch: SubscriptionPatch,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let status = patch.status.map(|s| s.as_str());
        let intent = patch
            .latest_payment_intent
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| DomainError::new(ErrorCode::InternalError, e.to_string()))?;

        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            r#"
            UPDATE subscriptions SET
                status = COALESCE($2, status),
                latest_invoice = CASE
                    WHEN $3::jsonb IS NULL THEN latest_invoice
                    ELSE jsonb_set(latest_invoice, '{{payment_intent}}', $3::jsonb)
                END,
                schedule_id = COALESCE($4, schedule_id),
                subscription_end = COALESCE($5, subscription_end),
                updated_at = now()
            WHERE subscription_id = $1
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(subscription_id)
        .bind(status)
        .bind(intent)
        .bind(patch.schedule_id)
        .bind(patch.subscription_end)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("failed to update subscription", e))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn cancel(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            r#"
            UPDATE subscriptions SET
                status = 'canceled',
                updated_at = now()
            WHERE subscription_id = $1
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("failed to cancel subscription", e))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }
}
