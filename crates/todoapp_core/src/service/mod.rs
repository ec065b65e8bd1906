//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Translate repository and credential failures into one error taxonomy
//!   that outer layers can map without inspecting storage details.
//!
//! # Invariants
//! - Every `ServiceError` belongs to exactly one `ErrorKind`.
//! - Unknown username and wrong password are indistinguishable
//!   (`InvalidCredentials`).

pub mod credential_service;
pub mod todo_service;
pub mod user_service;

use crate::model::todo::{TodoId, TodoValidationError};
use crate::model::user::{UserId, UserValidationError};
use crate::repo::RepoError;
use credential_service::CredentialError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Coarse failure class used by transport layers to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    DuplicateUsername,
    InvalidCredentials,
    Unauthorized,
    CryptoFailure,
    SigningFailure,
    Storage,
}

/// Service error for user, todo and credential use-cases.
#[derive(Debug)]
pub enum ServiceError {
    InvalidTodo(TodoValidationError),
    InvalidUser(UserValidationError),
    /// Referenced owner does not exist or is soft-deleted.
    OwnerNotFound(UserId),
    TodoNotFound(TodoId),
    UserNotFound(UserId),
    UsernameNotFound(String),
    DuplicateUsername(String),
    InvalidCredentials,
    Credential(CredentialError),
    Repo(RepoError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTodo(_) | Self::InvalidUser(_) | Self::OwnerNotFound(_) => {
                ErrorKind::Validation
            }
            Self::TodoNotFound(_) | Self::UserNotFound(_) | Self::UsernameNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::DuplicateUsername(_) => ErrorKind::DuplicateUsername,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::Credential(err) => err.kind(),
            Self::Repo(_) => ErrorKind::Storage,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTodo(err) => write!(f, "{err}"),
            Self::InvalidUser(err) => write!(f, "{err}"),
            Self::OwnerNotFound(id) => write!(f, "owner does not exist: {id}"),
            Self::TodoNotFound(id) => write!(f, "todo not found: {id}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::UsernameNotFound(username) => write!(f, "user not found: {username}"),
            Self::DuplicateUsername(username) => write!(f, "username already taken: {username}"),
            Self::InvalidCredentials => write!(f, "invalid username or password"),
            Self::Credential(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTodo(err) => Some(err),
            Self::InvalidUser(err) => Some(err),
            Self::Credential(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::InvalidTodo(err),
            RepoError::TodoNotFound(id) => Self::TodoNotFound(id),
            RepoError::UserNotFound(id) => Self::UserNotFound(id),
            RepoError::OwnerNotFound(id) => Self::OwnerNotFound(id),
            RepoError::DuplicateUsername(username) => Self::DuplicateUsername(username),
            other => Self::Repo(other),
        }
    }
}

impl From<TodoValidationError> for ServiceError {
    fn from(value: TodoValidationError) -> Self {
        Self::InvalidTodo(value)
    }
}

impl From<UserValidationError> for ServiceError {
    fn from(value: UserValidationError) -> Self {
        Self::InvalidUser(value)
    }
}

impl From<CredentialError> for ServiceError {
    fn from(value: CredentialError) -> Self {
        Self::Credential(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ServiceError};
    use crate::model::todo::TodoValidationError;
    use crate::repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn repo_errors_map_to_semantic_kinds() {
        let owner = Uuid::new_v4();
        assert_eq!(
            ServiceError::from(RepoError::OwnerNotFound(owner)).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ServiceError::from(RepoError::TodoNotFound(7)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ServiceError::from(RepoError::DuplicateUsername("a1".to_string())).kind(),
            ErrorKind::DuplicateUsername
        );
        assert_eq!(
            ServiceError::from(RepoError::Validation(TodoValidationError::EmptyTitle)).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ServiceError::from(RepoError::InvalidData("bad".to_string())).kind(),
            ErrorKind::Storage
        );
    }
}
