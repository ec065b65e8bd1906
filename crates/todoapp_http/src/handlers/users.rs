//! `/users` handlers.

use axum::extract::State;
use axum::http::StatusCode;
use todoapp_core::{RegisterUser, UserId};

use crate::dto::{CreateUserRequest, MessageResponse, UpdateUserRequest, UserResponse};
use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam};
use crate::state::AppState;

/// `POST /users`
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, JsonBody<UserResponse>), ApiError> {
    let registration = RegisterUser::from(request);
    let user = state
        .users(move |users| users.register(&registration))
        .await?;
    Ok((StatusCode::CREATED, JsonBody(user.into())))
}

/// `GET /users/{id}`
pub async fn get_user(
    State(state): State<AppState>,
    PathParam(id): PathParam<UserId>,
) -> Result<JsonBody<UserResponse>, ApiError> {
    let user = state.users(move |users| users.find_by_id(id)).await?;
    Ok(JsonBody(user.into()))
}

/// `GET /users/username/{username}`
pub async fn get_user_by_username(
    State(state): State<AppState>,
    PathParam(username): PathParam<String>,
) -> Result<JsonBody<UserResponse>, ApiError> {
    let user = state
        .users(move |users| users.find_by_username(&username))
        .await?;
    Ok(JsonBody(user.into()))
}

/// `PUT /users`
pub async fn update_user(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> Result<JsonBody<UserResponse>, ApiError> {
    let (id, patch) = request.into_parts();
    let user = state.users(move |users| users.update(id, &patch)).await?;
    Ok(JsonBody(user.into()))
}

/// `DELETE /users/{id}`
pub async fn delete_user(
    State(state): State<AppState>,
    PathParam(id): PathParam<UserId>,
) -> Result<JsonBody<MessageResponse>, ApiError> {
    state.users(move |users| users.delete(id)).await?;
    Ok(JsonBody(MessageResponse::new("user deleted")))
}
