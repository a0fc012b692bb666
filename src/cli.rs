use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::db::schema;
use crate::utils::sanitize::{mask_password, mask_secret};

#[derive(Parser)]
#[command(name = "webpay-gateway")]
#[command(about = "Webpay Plus checkout gateway", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Create the transactions table if it does not exist
    Setup,

    /// Drop the transactions table
    Drop,
}

pub async fn handle_db_setup(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Creating {} table...", schema::TRANSACTIONS_TABLE);
    schema::create_table_if_needed(&pool).await?;

    println!("✓ Table {} is ready", schema::TRANSACTIONS_TABLE);
    Ok(())
}

pub async fn handle_db_drop(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::warn!("Dropping {} table", schema::TRANSACTIONS_TABLE);
    schema::drop_table(&pool).await?;

    println!("✓ Table {} dropped", schema::TRANSACTIONS_TABLE);
    Ok(())
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");
    config.validate()?;

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Database URL: {}", mask_password(&config.database_url));
    println!("  Public Base URL: {}", config.public_base_url);
    println!("  Webpay Environment: {}", config.webpay_environment);
    println!("  Webpay API URL: {}", config.webpay_api_url);
    println!("  Commerce Code: {}", config.webpay_commerce_code);
    println!("  API Key: {}", mask_secret(&config.webpay_api_key));
    println!("  Order Store URL: {}", config.order_store_url);
    println!("  After Payment Status: {}", config.after_payment_status.as_str());
    println!("  Session TTL: {}s", config.session_ttl_secs);

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}
