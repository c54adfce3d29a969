use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::schemas::enrollment::ActionFailureBody;
use crate::services::accounts::AccountError;
use crate::services::errors::RecordsError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(&'static str),
    BadGateway(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let status = StatusCode::UNAUTHORIZED;
                let mut response = (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Forbidden(message) => {
                let status = StatusCode::FORBIDDEN;
                (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response()
            }
            ApiError::BadRequest(message) => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::NotFound(message) => {
                let status = StatusCode::NOT_FOUND;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::Conflict(message) => {
                let status = StatusCode::CONFLICT;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::TooManyRequests(message) => {
                let status = StatusCode::TOO_MANY_REQUESTS;
                (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response()
            }
            ApiError::BadGateway(message) => {
                tracing::error!(error = %message, "Upstream failure");
                let status = StatusCode::BAD_GATEWAY;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::ServiceUnavailable(message) => {
                tracing::error!(error = %message, "Service unavailable");
                let status = StatusCode::SERVICE_UNAVAILABLE;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
        }
    }
}

impl From<RecordsError> for ApiError {
    fn from(err: RecordsError) -> Self {
        match err {
            RecordsError::NotFound(message) => ApiError::NotFound(message),
            RecordsError::Validation(message) => ApiError::BadRequest(message),
            RecordsError::DuplicateAssignment(message) => ApiError::Conflict(message),
            RecordsError::Storage(message) => ApiError::BadGateway(message),
            RecordsError::Database(source) => ApiError::internal(source, "Database error"),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Conflict(message) => ApiError::Conflict(message),
            AccountError::NotFound(message) => ApiError::NotFound(message),
            AccountError::InvalidActivationToken => {
                ApiError::BadRequest("Activation link is invalid!".to_string())
            }
            AccountError::Security(source) => ApiError::internal(source, "Failed to secure account"),
            AccountError::Database(source) => ApiError::internal(source, "Database error"),
        }
    }
}

/// Failure of an enrollment action, rendered as `{success: false, kind, error}`.
#[derive(Debug)]
pub(crate) struct ActionFailure(pub(crate) RecordsError);

impl From<RecordsError> for ActionFailure {
    fn from(err: RecordsError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ActionFailure {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let (status, error) = match self.0 {
            RecordsError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            RecordsError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            RecordsError::DuplicateAssignment(message) => (StatusCode::CONFLICT, message),
            RecordsError::Storage(message) => {
                tracing::error!(error = %message, "Storage failure during enrollment action");
                (StatusCode::BAD_GATEWAY, "Storage failure".to_string())
            }
            RecordsError::Database(source) => {
                tracing::error!(error = %source, "Database failure during enrollment action");
                (StatusCode::INTERNAL_SERVER_ERROR, "An unexpected error occurred.".to_string())
            }
        };
        (status, Json(ActionFailureBody { success: false, kind, error })).into_response()
    }
}
