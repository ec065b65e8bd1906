//! Request extractors with `ApiError` rejections.
//!
//! Wrapping axum's `Json`, `Path` and `Query` routes every decoding failure
//! to `ApiError::BadRequest` (400) instead of axum's default 422 plain text.

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use todoapp_core::TokenClaims;

use crate::error::ApiError;
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// JSON body extractor and responder.
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

impl<T: serde::Serialize> IntoResponse for JsonBody<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Path parameter extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);

/// Query string extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// Verified token claims when an `Authorization` header is present.
///
/// A missing header yields `None`; a present but malformed or expired token
/// is rejected with 401.
#[derive(Debug, Clone)]
pub struct OptionalClaims(pub Option<TokenClaims>);

impl FromRequestParts<AppState> for OptionalClaims {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Self(None));
        };

        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ApiError::Unauthorized("expected 'Authorization: Bearer <token>'".to_string())
            })?;

        let claims = state.credentials().verify_token(token)?;
        Ok(Self(Some(claims)))
    }
}

/// Verified token claims; the request is rejected with 401 without them.
#[derive(Debug, Clone)]
pub struct RequiredClaims(pub TokenClaims);

impl FromRequestParts<AppState> for RequiredClaims {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match OptionalClaims::from_request_parts(parts, state).await? {
            OptionalClaims(Some(claims)) => Ok(Self(claims)),
            OptionalClaims(None) => Err(ApiError::Unauthorized("missing bearer token".to_string())),
        }
    }
}
