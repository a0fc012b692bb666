pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod ports;
pub mod redirect;
pub mod services;
pub mod utils;
pub mod validation;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;

use crate::health::Checkers;
use crate::services::orchestrator::RETURN_PATH;
use crate::services::TransactionOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TransactionOrchestrator>,
    pub checkers: Arc<Checkers>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(orchestrator: TransactionOrchestrator, checkers: Checkers) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            checkers: Arc::new(checkers),
            start_time: Instant::now(),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/checkout/:order_id", post(handlers::checkout::begin))
        .route(RETURN_PATH, post(handlers::webhook::notification))
        .route("/orders/:order_id/receipt", get(handlers::receipt::show))
        .layer(axum::middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .with_state(state)
}
