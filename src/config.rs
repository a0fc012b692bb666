use anyhow::Context;
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::str::FromStr;

use crate::domain::OrderStatus;
use crate::services::session_cache::DEFAULT_SESSION_TTL_SECS;

/// Public credentials Transbank publishes for its integration environment.
pub const INTEGRATION_COMMERCE_CODE: &str = "597055555532";
pub const INTEGRATION_API_KEY: &str =
    "579B532A7440BB0C9079DED94D31EA1615BACEB56610332264630D42D0A36B1C";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEnvironment {
    Integration,
    Production,
}

impl GatewayEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            GatewayEnvironment::Integration => "https://webpay3gint.transbank.cl",
            GatewayEnvironment::Production => "https://webpay3g.transbank.cl",
        }
    }
}

impl fmt::Display for GatewayEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayEnvironment::Integration => f.write_str("INTEGRACION"),
            GatewayEnvironment::Production => f.write_str("PRODUCCION"),
        }
    }
}

impl FromStr for GatewayEnvironment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INTEGRACION" | "INTEGRATION" => Ok(GatewayEnvironment::Integration),
            "PRODUCCION" | "PRODUCTION" => Ok(GatewayEnvironment::Production),
            other => anyhow::bail!(
                "WEBPAY_ENVIRONMENT must be INTEGRACION or PRODUCCION, got '{}'",
                other
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    /// Externally reachable base URL of this service; the gateway posts back here.
    pub public_base_url: String,
    pub webpay_environment: GatewayEnvironment,
    pub webpay_commerce_code: String,
    pub webpay_api_key: String,
    pub webpay_api_url: String,
    pub order_store_url: String,
    pub order_store_token: Option<String>,
    pub after_payment_status: OrderStatus,
    pub session_ttl_secs: u64,
    pub gateway_failure_threshold: u32,
    pub gateway_reset_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        let webpay_environment: GatewayEnvironment = env::var("WEBPAY_ENVIRONMENT")
            .unwrap_or_else(|_| "INTEGRACION".to_string())
            .parse()?;

        let (webpay_commerce_code, webpay_api_key) = credentials(
            webpay_environment,
            env::var("WEBPAY_COMMERCE_CODE").ok(),
            env::var("WEBPAY_API_KEY").ok(),
        )?;

        let after_payment_status = env::var("AFTER_PAYMENT_ORDER_STATUS")
            .unwrap_or_else(|_| "processing".to_string())
            .parse::<OrderStatus>()
            .map_err(anyhow::Error::msg)?;

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("SERVER_PORT must be a port number")?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            public_base_url: env::var("PUBLIC_BASE_URL").context("PUBLIC_BASE_URL must be set")?,
            webpay_api_url: env::var("WEBPAY_API_URL")
                .unwrap_or_else(|_| webpay_environment.base_url().to_string()),
            webpay_environment,
            webpay_commerce_code,
            webpay_api_key,
            order_store_url: env::var("ORDER_STORE_URL").context("ORDER_STORE_URL must be set")?,
            order_store_token: env::var("ORDER_STORE_TOKEN").ok(),
            after_payment_status,
            session_ttl_secs: parse_or("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?,
            gateway_failure_threshold: parse_or("GATEWAY_FAILURE_THRESHOLD", 3)?,
            gateway_reset_timeout_secs: parse_or("GATEWAY_RESET_TIMEOUT_SECS", 60)?,
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server_port == 0 {
            anyhow::bail!("SERVER_PORT must be greater than 0");
        }
        for (name, value) in [
            ("PUBLIC_BASE_URL", &self.public_base_url),
            ("WEBPAY_API_URL", &self.webpay_api_url),
            ("ORDER_STORE_URL", &self.order_store_url),
        ] {
            url::Url::parse(value).with_context(|| format!("{} is not a valid URL", name))?;
        }
        if self.webpay_environment == GatewayEnvironment::Production
            && self.webpay_commerce_code == INTEGRATION_COMMERCE_CODE
        {
            anyhow::bail!("PRODUCCION requires your own WEBPAY_COMMERCE_CODE");
        }
        Ok(())
    }
}

/// Integration falls back to the public test commerce; production must be explicit.
fn credentials(
    environment: GatewayEnvironment,
    commerce_code: Option<String>,
    api_key: Option<String>,
) -> anyhow::Result<(String, String)> {
    match (environment, commerce_code, api_key) {
        (_, Some(code), Some(key)) => Ok((code, key)),
        (GatewayEnvironment::Integration, None, None) => Ok((
            INTEGRATION_COMMERCE_CODE.to_string(),
            INTEGRATION_API_KEY.to_string(),
        )),
        _ => anyhow::bail!(
            "WEBPAY_COMMERCE_CODE and WEBPAY_API_KEY must both be set for {}",
            environment
        ),
    }
}

fn parse_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}
