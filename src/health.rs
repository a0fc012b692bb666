use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::gateway::WebpayClient;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub dependencies: HashMap<String, DependencyStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyStatus {
    Healthy { status: String, latency_ms: u64 },
    Unhealthy { status: String, error: String },
}

#[async_trait]
pub trait DependencyChecker: Send + Sync {
    async fn check(&self) -> DependencyStatus;

    /// A failing critical dependency makes the whole service unhealthy.
    fn is_critical(&self) -> bool {
        false
    }
}

pub struct PostgresChecker {
    pool: sqlx::PgPool,
}

impl PostgresChecker {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DependencyChecker for PostgresChecker {
    async fn check(&self) -> DependencyStatus {
        let start = Instant::now();
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => DependencyStatus::Healthy {
                status: "healthy".to_string(),
                latency_ms: start.elapsed().as_millis() as u64,
            },
            Err(e) => DependencyStatus::Unhealthy {
                status: "unhealthy".to_string(),
                error: e.to_string(),
            },
        }
    }

    fn is_critical(&self) -> bool {
        true
    }
}

/// Reports the Webpay circuit breaker without calling the gateway.
pub struct GatewayChecker {
    client: WebpayClient,
}

impl GatewayChecker {
    pub fn new(client: WebpayClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DependencyChecker for GatewayChecker {
    async fn check(&self) -> DependencyStatus {
        match self.client.circuit_state().as_str() {
            "closed" => DependencyStatus::Healthy {
                status: "healthy".to_string(),
                latency_ms: 0,
            },
            state => DependencyStatus::Unhealthy {
                status: "unhealthy".to_string(),
                error: format!("circuit breaker {}", state),
            },
        }
    }
}

pub type Checkers = Vec<(String, Arc<dyn DependencyChecker>)>;

pub async fn check_health(checkers: &Checkers, start_time: Instant) -> HealthResponse {
    let timeout_duration = Duration::from_secs(5);

    let mut dependencies = HashMap::new();
    let mut critical = Vec::new();
    for (name, checker) in checkers {
        let status = timeout(timeout_duration, checker.check())
            .await
            .unwrap_or_else(|_| DependencyStatus::Unhealthy {
                status: "unhealthy".to_string(),
                error: "timeout".to_string(),
            });
        if checker.is_critical() {
            critical.push(name.clone());
        }
        dependencies.insert(name.clone(), status);
    }

    let overall_status = determine_overall_status(&dependencies, &critical);

    HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: start_time.elapsed().as_secs(),
        dependencies,
    }
}

fn determine_overall_status(
    dependencies: &HashMap<String, DependencyStatus>,
    critical: &[String],
) -> String {
    let mut has_critical_failure = false;
    let mut has_non_critical_failure = false;

    for (name, status) in dependencies {
        if matches!(status, DependencyStatus::Unhealthy { .. }) {
            if critical.contains(name) {
                has_critical_failure = true;
            } else {
                has_non_critical_failure = true;
            }
        }
    }

    if has_critical_failure {
        "unhealthy".to_string()
    } else if has_non_critical_failure {
        "degraded".to_string()
    } else {
        "healthy".to_string()
    }
}
