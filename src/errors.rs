use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{PartialSchema, ToSchema};

use crate::store::StoreError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    status: u16,
    inner_status: Option<u16>,
    message: String,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let code = StatusCode::from_u16(self.status).unwrap();
        let body = Json(self);

        (code, body).into_response()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),
    #[error("Handler failed with status {0}: {1}")]
    HandlerError(StatusCode, String),
}

fn store_error_status(e: &StoreError) -> (u16, Option<u16>) {
    let inner = match e {
        StoreError::Get(e) => e.raw_response().map(|r| r.status().as_u16()),
        StoreError::Put(e) => e.raw_response().map(|r| r.status().as_u16()),
        StoreError::Scan(e) => e.raw_response().map(|r| r.status().as_u16()),
        StoreError::Update(e) => e.raw_response().map(|r| r.status().as_u16()),
        StoreError::Delete(e) => e.raw_response().map(|r| r.status().as_u16()),
        _ => None,
    };
    let status = match e {
        // Optimistic retries exhausted; the operation is safe to re-issue.
        StoreError::Conflict { .. } => StatusCode::SERVICE_UNAVAILABLE.as_u16(),
        _ => StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
    };
    (status, inner)
}

impl From<HandlerError> for ErrorResponse {
    fn from(value: HandlerError) -> Self {
        let (status, inner_status) = match &value {
            HandlerError::HandlerError(s, _) => (s.as_u16(), None),
            HandlerError::Store(e) => store_error_status(e),
        };
        Self {
            status,
            inner_status,
            message: value.to_string(),
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> axum::response::Response {
        ErrorResponse::from(self).into_response()
    }
}

impl PartialSchema for HandlerError {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        ErrorResponse::schema()
    }
}

impl ToSchema for HandlerError {
    fn schemas(
        schemas: &mut Vec<(
            String,
            utoipa::openapi::RefOr<utoipa::openapi::schema::Schema>,
        )>,
    ) {
        <ErrorResponse as ToSchema>::schemas(schemas);
    }
}

impl HandlerError {
    pub fn not_found() -> Self {
        Self::HandlerError(StatusCode::NOT_FOUND, "Listing not found".to_string())
    }

    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::HandlerError(StatusCode::FORBIDDEN, message.into())
    }

    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::HandlerError(StatusCode::CONFLICT, message.into())
    }

    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::HandlerError(StatusCode::BAD_REQUEST, message.into())
    }
}
