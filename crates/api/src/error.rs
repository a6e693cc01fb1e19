//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use engine::OrderError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Order placement error.
    Order(OrderError),
    /// Relational store error.
    Store(StoreError),
    /// Internal server error; the message stays in the logs.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Order(err) => order_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
            ApiError::Internal(msg) => internal(&msg),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

/// Internal details are logged, never surfaced to the client.
fn internal(detail: &str) -> (StatusCode, String) {
    tracing::error!(error = %detail, "internal server error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error".to_string(),
    )
}

fn order_error_to_response(err: OrderError) -> (StatusCode, String) {
    match &err {
        OrderError::InvalidRequest(_)
        | OrderError::ProductNotFound(_)
        | OrderError::InsufficientStock { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        OrderError::UserNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        OrderError::Persistence(_) => internal(&err.to_string()),
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, String) {
    match &err {
        StoreError::DuplicateIdentity(_)
        | StoreError::DuplicateSku(_)
        | StoreError::Constraint(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        StoreError::Database(_) | StoreError::Migration(_) => internal(&err.to_string()),
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<activity::ActivityError> for ApiError {
    fn from(err: activity::ActivityError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
