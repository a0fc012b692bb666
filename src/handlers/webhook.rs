use axum::{body::Bytes, extract::State};

use crate::error::AppError;
use crate::redirect::RedirectForm;
use crate::services::NotificationPayload;
use crate::AppState;

/// Gateway return endpoint. The body is the browser's form post carrying `token_ws`.
pub async fn notification(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<RedirectForm, AppError> {
    let payload = NotificationPayload::from_form(&body);

    let outcome = state
        .orchestrator
        .handle_notification(&payload)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Webpay notification failed");
            e
        })?;

    Ok(outcome.redirect())
}
