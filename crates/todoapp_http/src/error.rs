//! API error type and status mapping.
//!
//! Every failure leaving a handler is an `ApiError`; its `IntoResponse`
//! produces the status code and a `{"error": message}` body.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use todoapp_core::{CredentialError, ErrorKind, ServiceError};

const INTERNAL_MESSAGE: &str = "internal server error";

/// Wire body for every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Boundary error carrying the client-facing message.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request could not be decoded (malformed JSON, wrong types, bad path id).
    #[error("{0}")]
    BadRequest(String),

    /// Request decoded but violates a field rule.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Route exists but not for the request method.
    #[error("{0}")]
    MethodNotAllowed(String),

    /// Details are logged and replaced by a generic message on the wire.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => INTERNAL_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(details) = &self {
            error!("event=http_error module=http status=error error_code=internal error={details}");
        }
        let body = ErrorBody {
            error: self.client_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::DuplicateUsername => Self::Conflict(message),
            ErrorKind::InvalidCredentials | ErrorKind::Unauthorized => Self::Unauthorized(message),
            ErrorKind::CryptoFailure | ErrorKind::SigningFailure | ErrorKind::Storage => {
                Self::Internal(message)
            }
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidToken(_) => Self::Unauthorized("invalid or expired token".to_string()),
            other => ServiceError::from(other).into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
