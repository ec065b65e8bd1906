//! Core domain logic for the todo service.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use model::todo::{NewTodo, Todo, TodoId, TodoUpdate, TodoValidationError};
pub use model::user::{User, UserChanges, UserId, UserValidationError};
pub use repo::memory_repo::MemoryStore;
pub use repo::shared_sqlite::SharedSqlite;
pub use repo::todo_repo::{SqliteTodoRepository, TodoListQuery, TodoRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::credential_service::{
    CredentialConfig, CredentialError, CredentialService, HashCost, IssuedToken, TokenClaims,
};
pub use service::todo_service::TodoService;
pub use service::user_service::{RegisterUser, UserPatch, UserService};
pub use service::{ErrorKind, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
