use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::services::ReceiptOutcome;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReceiptQuery {
    pub key: String,
}

pub async fn show(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Query(query): Query<ReceiptQuery>,
) -> Result<Json<Value>, AppError> {
    let body = match state.orchestrator.receipt(&order_id, &query.key).await? {
        ReceiptOutcome::Receipt(receipt) => json!({ "receipt": receipt }),
        ReceiptOutcome::Cancelled { retry_url, notices } => json!({
            "cancelled": true,
            "retry_url": retry_url,
            "notices": notices,
        }),
        ReceiptOutcome::Empty { notices } => json!({ "notices": notices }),
    };

    Ok(Json(body))
}
