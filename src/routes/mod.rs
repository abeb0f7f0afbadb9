// src/routes/mod.rs

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub mod categories;
pub mod dashboard;
pub mod health;
pub mod kpis;
pub mod metrics;

/// Error taxonomy shared by every handler. Calculation code never raises;
/// all failures here are validation results or storage errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(%message, "request failed");
        }
        (status, Json(ErrorEnvelope { success: false, error: message })).into_response()
    }
}

/// Common storage error mapper: row-not-found and the unique-constraint
/// violation are recognized, everything else surfaces as a 500 with the
/// underlying message. No retries anywhere.
pub fn storage_error(e: sqlx::Error) -> ApiError {
    remap(e, "Resource not found")
}

/// Like `storage_error` but with an entity-specific not-found message.
pub fn missing(entity: &'static str) -> impl Fn(sqlx::Error) -> ApiError {
    move |e| remap(e, entity)
}

fn remap(e: sqlx::Error, not_found: &str) -> ApiError {
    match e {
        sqlx::Error::RowNotFound => ApiError::NotFound(not_found.to_string()),
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            // the only unique constraint in the schema is categories.name
            ApiError::Conflict("Category name already exists".to_string())
        }
        other => ApiError::Internal(other.to_string()),
    }
}

// ───────────────────────────────────────
// Success envelope
// ───────────────────────────────────────

#[derive(Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { success: true, data, count: None })
}

pub fn ok_with_count<T: Serialize>(data: T, count: usize) -> Json<Envelope<T>> {
    Json(Envelope { success: true, data, count: Some(count) })
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, ok(data))
}

pub fn created_with_count<T: Serialize>(data: T, count: usize) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, ok_with_count(data, count))
}

/// Fallback for known paths hit with an unsupported method.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Router-wide fallback for unknown paths.
pub async fn unknown_route() -> ApiError {
    ApiError::NotFound("Resource not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_entity_message() {
        let err = missing("KPI not found")(sqlx::Error::RowNotFound);
        match err {
            ApiError::NotFound(msg) => assert_eq!(msg, "KPI not found"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(ApiError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Conflict("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::MethodNotAllowed.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(ApiError::Internal("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn envelope_count_is_omitted_when_absent() {
        let with = serde_json::to_value(&Envelope { success: true, data: 1, count: Some(3) }).unwrap();
        assert_eq!(with["count"], 3);
        let without = serde_json::to_value(&Envelope::<i32> { success: true, data: 1, count: None }).unwrap();
        assert!(without.get("count").is_none());
    }
}
