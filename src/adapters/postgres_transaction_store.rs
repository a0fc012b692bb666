//! Postgres implementation of TransactionStore.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{TransactionRecord, TransactionStatus};
use crate::ports::{RepositoryError, RepositoryResult, TransactionStore};

/// Postgres-backed transaction store.
#[derive(Clone)]
pub struct PostgresTransactionStore {
    pool: PgPool,
}

impl PostgresTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for PostgresTransactionStore {
    async fn create_transaction(&self, record: &TransactionRecord) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO webpay_transactions (token, order_id, amount, session_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&record.token)
        .bind(&record.order_id)
        .bind(record.amount)
        .bind(&record.session_id)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::DuplicateToken(record.token.clone())
            }
            other => RepositoryError::from(other),
        })?;

        Ok(())
    }

    async fn get_by_token(&self, token: &str) -> RepositoryResult<TransactionRecord> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT token, order_id, amount, session_id, status, created_at FROM webpay_transactions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.ok_or_else(|| RepositoryError::NotFound(token.to_string()))?
            .into_domain()
    }

    async fn finalize(&self, token: &str, status: TransactionStatus) -> RepositoryResult<bool> {
        let result = sqlx::query(
            "UPDATE webpay_transactions SET status = $1 WHERE token = $2 AND status = $3",
        )
        .bind(status.as_str())
        .bind(token)
        .bind(TransactionStatus::Init.as_str())
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, token: &str, status: TransactionStatus) -> RepositoryResult<bool> {
        let result = sqlx::query(
            "UPDATE webpay_transactions SET status = $1 WHERE token = $2 AND status = $3",
        )
        .bind(TransactionStatus::Init.as_str())
        .bind(token)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_order(&self, order_id: &str) -> RepositoryResult<Vec<TransactionRecord>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT token, order_id, amount, session_id, status, created_at FROM webpay_transactions WHERE order_id = $1 ORDER BY created_at",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        rows.into_iter().map(TransactionRow::into_domain).collect()
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    token: String,
    order_id: String,
    amount: i64,
    session_id: String,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> RepositoryResult<TransactionRecord> {
        let status = self
            .status
            .parse::<TransactionStatus>()
            .map_err(RepositoryError::Corrupt)?;

        Ok(TransactionRecord {
            order_id: self.order_id,
            amount: self.amount,
            token: self.token,
            session_id: self.session_id,
            status,
            created_at: self.created_at,
        })
    }
}
