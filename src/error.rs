use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ports::{GatewayError, OrderStoreError, RepositoryError};

/// Prefix of every message shown to a buyer whose order ended abnormally.
pub const UNEXPECTED_END_MESSAGE: &str =
    "Estimado cliente, le informamos que su orden terminó de forma inesperada";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Estimado cliente, le informamos que su orden terminó de forma inesperada: No se encontro el token")]
    MissingToken,

    #[error("Token '{0}' no se encontró en la base de datos de transacciones, por lo que no se puede completar el proceso")]
    TokenNotFound(String),

    #[error("Token '{0}' is already registered")]
    DuplicateToken(String),

    #[error("Currency {0} is not supported by Webpay Plus")]
    UnsupportedCurrency(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Order store error: {0}")]
    OrderStore(OrderStoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingToken => StatusCode::BAD_REQUEST,
            AppError::TokenNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateToken(_) => StatusCode::CONFLICT,
            AppError::UnsupportedCurrency(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Gateway(_) | AppError::OrderStore(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateToken(token) => AppError::DuplicateToken(token),
            RepositoryError::NotFound(token) => AppError::TokenNotFound(token),
            RepositoryError::Database(e) => AppError::DatabaseError(e.to_string()),
            RepositoryError::Corrupt(msg) => AppError::Internal(msg),
        }
    }
}

impl From<OrderStoreError> for AppError {
    fn from(err: OrderStoreError) -> Self {
        match err {
            OrderStoreError::NotFound(id) => AppError::NotFound(format!("Order {} not found", id)),
            other => AppError::OrderStore(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
