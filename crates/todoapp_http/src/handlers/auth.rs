//! `/auth` handlers.

use axum::extract::State;
use axum::http::StatusCode;
use todoapp_core::RegisterUser;

use crate::dto::{CreateUserRequest, SignInRequest, TokenResponse, UserResponse};
use crate::error::ApiError;
use crate::extract::{JsonBody, RequiredClaims};
use crate::state::AppState;

/// `POST /auth/sign-up`
pub async fn sign_up(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, JsonBody<UserResponse>), ApiError> {
    let registration = RegisterUser::from(request);
    let user = state
        .users(move |users| users.register(&registration))
        .await?;
    Ok((StatusCode::CREATED, JsonBody(user.into())))
}

/// `POST /auth/sign-in`
pub async fn sign_in(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SignInRequest>,
) -> Result<JsonBody<TokenResponse>, ApiError> {
    let issued = state
        .users(move |users| users.sign_in(&request.username, &request.password))
        .await?;
    Ok(JsonBody(issued.into()))
}

/// `GET /auth/me`
///
/// A token whose subject was deleted after issue is treated as invalid.
pub async fn me(
    State(state): State<AppState>,
    RequiredClaims(claims): RequiredClaims,
) -> Result<JsonBody<UserResponse>, ApiError> {
    let user = state
        .users(move |users| users.find_by_id(claims.user_id))
        .await
        .map_err(|err| match err {
            ApiError::NotFound(_) => ApiError::Unauthorized("invalid or expired token".to_string()),
            other => other,
        })?;
    Ok(JsonBody(user.into()))
}
