use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::AppError;
use crate::redirect::RedirectForm;
use crate::services::orchestrator::TOKEN_FIELD;
use crate::services::BeginOutcome;
use crate::AppState;

/// Starts a Webpay transaction for the order and auto-posts the buyer to the gateway.
pub async fn begin(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Response, AppError> {
    match state.orchestrator.begin_transaction(&order_id).await? {
        BeginOutcome::Redirect { url, token } => {
            Ok(RedirectForm::new(url).param(TOKEN_FIELD, token).into_response())
        }
        BeginOutcome::GatewayUnavailable { notice } => Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "notice": notice })),
        )
            .into_response()),
    }
}
