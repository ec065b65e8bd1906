//! Wire-shaped request and response bodies.
//!
//! Domain records never cross the boundary directly; responses are built
//! from them here so that storage-only fields (`password_hash`,
//! `is_deleted`) stay internal.

use serde::{Deserialize, Serialize};
use todoapp_core::{
    IssuedToken, NewTodo, RegisterUser, Todo, TodoId, TodoListQuery, TodoUpdate, User, UserId,
    UserPatch,
};

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub username: String,
    pub password: String,
}

impl From<CreateUserRequest> for RegisterUser {
    fn from(request: CreateUserRequest) -> Self {
        Self {
            name: request.name,
            username: request.username,
            password: request.password,
        }
    }
}

/// Body of `PUT /users`; omitted fields are left unchanged.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl UpdateUserRequest {
    pub fn into_parts(self) -> (UserId, UserPatch) {
        (
            self.id,
            UserPatch {
                name: self.name,
                username: self.username,
                password: self.password,
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            username: user.username,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    /// Expiry in epoch milliseconds.
    pub expires_at: i64,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: issued.token,
            token_type: "Bearer".to_string(),
            expires_at: issued.expires_at,
        }
    }
}

// =============================================================================
// Todos
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, alias = "owner_id")]
    pub owner: Option<UserId>,
}

impl CreateTodoRequest {
    /// Builds the draft; `fallback_owner` applies when the body names none.
    pub fn into_draft(self, fallback_owner: Option<UserId>) -> NewTodo {
        NewTodo {
            title: self.title,
            description: self.description,
            completed: self.completed,
            owner_id: self.owner.or(fallback_owner),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

impl From<UpdateTodoRequest> for TodoUpdate {
    fn from(request: UpdateTodoRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            completed: request.completed,
        }
    }
}

/// Query string of `GET /todos`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoListParams {
    pub completed: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<TodoListParams> for TodoListQuery {
    fn from(params: TodoListParams) -> Self {
        Self {
            completed: params.completed,
            title_contains: params.search,
            limit: params.limit,
            offset: params.offset.unwrap_or(0),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoResponse {
    pub id: TodoId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Todo> for TodoResponse {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id,
            title: todo.title,
            description: todo.description,
            completed: todo.completed,
            owner_id: todo.owner_id,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}

// =============================================================================
// Misc
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
