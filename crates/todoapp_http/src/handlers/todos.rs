//! `/todos` handlers.

use axum::extract::State;
use axum::http::StatusCode;
use todoapp_core::{TodoId, TodoListQuery, TodoUpdate, UserId};

use crate::dto::{
    CreateTodoRequest, MessageResponse, TodoListParams, TodoResponse, UpdateTodoRequest,
};
use crate::error::ApiError;
use crate::extract::{JsonBody, OptionalClaims, PathParam, QueryParams};
use crate::state::AppState;

fn to_responses(todos: Vec<todoapp_core::Todo>) -> JsonBody<Vec<TodoResponse>> {
    JsonBody(todos.into_iter().map(TodoResponse::from).collect())
}

/// `POST /todos`
///
/// Without an explicit owner the todo belongs to the bearer token subject,
/// if any.
pub async fn create_todo(
    State(state): State<AppState>,
    OptionalClaims(claims): OptionalClaims,
    JsonBody(request): JsonBody<CreateTodoRequest>,
) -> Result<(StatusCode, JsonBody<TodoResponse>), ApiError> {
    let draft = request.into_draft(claims.map(|claims| claims.user_id));
    let todo = state.todos(move |todos| todos.create(&draft)).await?;
    Ok((StatusCode::CREATED, JsonBody(todo.into())))
}

/// `GET /todos`
pub async fn list_todos(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<TodoListParams>,
) -> Result<JsonBody<Vec<TodoResponse>>, ApiError> {
    let query = TodoListQuery::from(params);
    let todos = state.todos(move |todos| todos.list(&query)).await?;
    Ok(to_responses(todos))
}

/// `GET /todos/user/{owner_id}`
pub async fn list_user_todos(
    State(state): State<AppState>,
    PathParam(owner_id): PathParam<UserId>,
) -> Result<JsonBody<Vec<TodoResponse>>, ApiError> {
    let todos = state
        .todos(move |todos| todos.list_by_owner(owner_id))
        .await?;
    Ok(to_responses(todos))
}

/// `GET /todos/{id}`
pub async fn get_todo(
    State(state): State<AppState>,
    PathParam(id): PathParam<TodoId>,
) -> Result<JsonBody<TodoResponse>, ApiError> {
    let todo = state.todos(move |todos| todos.get_by_id(id)).await?;
    Ok(JsonBody(todo.into()))
}

/// `PUT /todos/{id}`
pub async fn update_todo(
    State(state): State<AppState>,
    PathParam(id): PathParam<TodoId>,
    JsonBody(request): JsonBody<UpdateTodoRequest>,
) -> Result<JsonBody<TodoResponse>, ApiError> {
    let update = TodoUpdate::from(request);
    let todo = state.todos(move |todos| todos.update(id, &update)).await?;
    Ok(JsonBody(todo.into()))
}

/// `PATCH /todos/{id}/toggle`
pub async fn toggle_todo(
    State(state): State<AppState>,
    PathParam(id): PathParam<TodoId>,
) -> Result<JsonBody<TodoResponse>, ApiError> {
    let todo = state.todos(move |todos| todos.toggle_complete(id)).await?;
    Ok(JsonBody(todo.into()))
}

/// `PATCH /todos/{id}/complete`
pub async fn complete_todo(
    State(state): State<AppState>,
    PathParam(id): PathParam<TodoId>,
) -> Result<JsonBody<TodoResponse>, ApiError> {
    let todo = state.todos(move |todos| todos.mark_completed(id)).await?;
    Ok(JsonBody(todo.into()))
}

/// `PATCH /todos/{id}/activate`
pub async fn activate_todo(
    State(state): State<AppState>,
    PathParam(id): PathParam<TodoId>,
) -> Result<JsonBody<TodoResponse>, ApiError> {
    let todo = state.todos(move |todos| todos.mark_active(id)).await?;
    Ok(JsonBody(todo.into()))
}

/// `DELETE /todos/{id}`
pub async fn delete_todo(
    State(state): State<AppState>,
    PathParam(id): PathParam<TodoId>,
) -> Result<JsonBody<MessageResponse>, ApiError> {
    state.todos(move |todos| todos.delete(id)).await?;
    Ok(JsonBody(MessageResponse::new("todo deleted")))
}
