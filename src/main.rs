use axum::Server;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webpay_gateway::adapters::{HttpOrderStore, PostgresTransactionStore};
use webpay_gateway::cli::{self, Cli, Commands, DbCommands};
use webpay_gateway::config::Config;
use webpay_gateway::gateway::WebpayClient;
use webpay_gateway::health::{Checkers, DependencyChecker, GatewayChecker, PostgresChecker};
use webpay_gateway::services::{OrchestratorConfig, SessionCache, TransactionOrchestrator};
use webpay_gateway::{create_app, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup logging; LOG_FORMAT=json switches to one JSON object per line
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    );
    if std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Some(Commands::Db(DbCommands::Setup)) => cli::handle_db_setup(&config).await,
        Some(Commands::Db(DbCommands::Drop)) => cli::handle_db_drop(&config).await,
        Some(Commands::Config) => cli::handle_config_validate(&config),
        Some(Commands::Serve) | None => serve(config).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    let pool = db::create_pool(&config).await?;
    db::schema::create_table_if_needed(&pool).await?;
    tracing::info!("Database schema ready");

    let webpay = WebpayClient::with_circuit_breaker(
        config.webpay_api_url.clone(),
        config.webpay_commerce_code.clone(),
        config.webpay_api_key.clone(),
        config.gateway_failure_threshold,
        config.gateway_reset_timeout_secs,
    );
    tracing::info!(
        environment = %config.webpay_environment,
        "Webpay client initialized with URL: {}",
        config.webpay_api_url
    );

    let orders = HttpOrderStore::new(config.order_store_url.clone(), config.order_store_token.clone());

    let sessions = SessionCache::new(Duration::from_secs(config.session_ttl_secs));
    sessions.start();

    let orchestrator = TransactionOrchestrator::new(
        Arc::new(PostgresTransactionStore::new(pool.clone())),
        Arc::new(webpay.clone()),
        Arc::new(orders),
        sessions,
        OrchestratorConfig::new(&config.public_base_url, config.after_payment_status),
    );

    let checkers: Checkers = vec![
        (
            "postgres".to_string(),
            Arc::new(PostgresChecker::new(pool)) as Arc<dyn DependencyChecker>,
        ),
        (
            "webpay".to_string(),
            Arc::new(GatewayChecker::new(webpay)) as Arc<dyn DependencyChecker>,
        ),
    ];

    let app = create_app(AppState::new(orchestrator, checkers));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
