use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use crate::config::Config;

pub mod schema;

pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
}
