//! Lifecycle of the transactions table: created on setup, dropped on uninstall.

use sqlx::PgPool;
use tracing::info;

pub const TRANSACTIONS_TABLE: &str = "webpay_transactions";

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS webpay_transactions (
    token       TEXT        PRIMARY KEY,
    order_id    TEXT        NOT NULL,
    amount      BIGINT      NOT NULL,
    session_id  TEXT        NOT NULL,
    status      TEXT        NOT NULL DEFAULT 'INIT',
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_ORDER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS webpay_transactions_order_id_idx ON webpay_transactions (order_id)";

const DROP_TABLE: &str = "DROP TABLE IF EXISTS webpay_transactions";

/// Safe to run on every start.
pub async fn create_table_if_needed(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query(CREATE_TABLE).execute(&mut *tx).await?;
    sqlx::query(CREATE_ORDER_INDEX).execute(&mut *tx).await?;
    tx.commit().await?;

    info!(table = TRANSACTIONS_TABLE, "Transactions table ready");
    Ok(())
}

/// Removes every stored transaction. Only for uninstalling.
pub async fn drop_table(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(DROP_TABLE).execute(pool).await?;

    info!(table = TRANSACTIONS_TABLE, "Transactions table dropped");
    Ok(())
}
