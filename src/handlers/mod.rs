pub mod checkout;
pub mod receipt;
pub mod webhook;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::health::check_health;
use crate::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let report = check_health(&state.checkers, state.start_time).await;

    // Return 503 only when a critical dependency is down
    let status_code = if report.status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status_code, Json(report))
}
