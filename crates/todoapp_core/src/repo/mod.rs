//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for users and todos.
//! - Isolate SQLite query details from service/business orchestration.
//! - Provide an in-memory backend with identical semantics for tests and
//!   ephemeral deployments.
//!
//! # Invariants
//! - Every read-modify-write is a single store operation (one SQL statement
//!   or one critical section), never a read followed by a separate write.
//! - Soft-deleted rows are invisible unless a query explicitly asks for them.
//! - Repository APIs return semantic errors (`*NotFound`, `DuplicateUsername`)
//!   in addition to transport errors.

pub mod memory_repo;
pub mod shared_sqlite;
pub mod todo_repo;
pub mod user_repo;

use crate::db::DbError;
use crate::model::todo::{TodoId, TodoValidationError};
use crate::model::user::UserId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for user/todo persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(TodoValidationError),
    Db(DbError),
    TodoNotFound(TodoId),
    UserNotFound(UserId),
    /// Referenced owner does not exist or is soft-deleted.
    OwnerNotFound(UserId),
    DuplicateUsername(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::TodoNotFound(id) => write!(f, "todo not found: {id}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::OwnerNotFound(id) => write!(f, "owner does not exist: {id}"),
            Self::DuplicateUsername(username) => {
                write!(f, "username already taken: {username}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TodoValidationError> for RepoError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_user_id(value: &str, column: &str) -> RepoResult<UserId> {
    UserId::parse_str(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}"))
    })
}
