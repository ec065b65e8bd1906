//! Route table.

use axum::http::Method;
use axum::routing::{get, patch, post};
use axum::Router;

use crate::error::ApiError;
use crate::handlers::{auth, health, todos, users};
use crate::middleware::log_requests;
use crate::state::AppState;

/// Builds the full application router over `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        // Users
        .route("/users", post(users::create_user).put(users::update_user))
        .route(
            "/users/{id}",
            get(users::get_user).delete(users::delete_user),
        )
        .route(
            "/users/username/{username}",
            get(users::get_user_by_username),
        )
        // Auth
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/me", get(auth::me))
        // Todos
        .route("/todos", get(todos::list_todos).post(todos::create_todo))
        .route(
            "/todos/{id}",
            get(todos::get_todo)
                .put(todos::update_todo)
                .delete(todos::delete_todo),
        )
        .route("/todos/user/{owner_id}", get(todos::list_user_todos))
        .route("/todos/{id}/toggle", patch(todos::toggle_todo))
        .route("/todos/{id}/complete", patch(todos::complete_todo))
        .route("/todos/{id}/activate", patch(todos::activate_todo))
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(axum::middleware::from_fn(log_requests))
        .with_state(state)
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("route not found".to_string())
}

async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(format!("method {method} not allowed for this route"))
}
