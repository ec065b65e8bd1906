//! User domain model.
//!
//! # Responsibility
//! - Define the canonical user account record.
//! - Provide field rules for registration and profile edits.
//!
//! # Invariants
//! - `id` is stable and never reused for another account.
//! - `username` is unique among users with `is_deleted = false`.
//! - `password_hash` is a PHC string and is never serialized.

use crate::model::now_epoch_ms;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use uuid::Uuid;

/// Stable identifier for user accounts.
pub type UserId = Uuid;

/// Minimum accepted password length in characters.
pub const PASSWORD_MIN_CHARS: usize = 6;

/// Canonical persisted user record.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_deleted: bool,
}

impl User {
    /// Creates an active user with a generated id and current timestamps.
    pub fn new(
        name: impl Into<String>,
        username: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            username: username.into(),
            password_hash: password_hash.into(),
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }

    /// Returns whether this account should be considered visible/active.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}

// Hand-written so the hash never ends up in logs via `{:?}`.
impl Debug for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("is_deleted", &self.is_deleted)
            .finish()
    }
}

/// Partial update applied to an existing user row.
///
/// `None` leaves the stored column unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.username.is_none() && self.password_hash.is_none()
    }
}

/// Validation failures for user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyName,
    EmptyUsername,
    PasswordTooShort { min: usize, actual: usize },
    NoChanges,
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name cannot be empty"),
            Self::EmptyUsername => write!(f, "username cannot be empty"),
            Self::PasswordTooShort { min, .. } => {
                write!(f, "password must be at least {min} characters")
            }
            Self::NoChanges => write!(f, "update must change at least one field"),
        }
    }
}

impl Error for UserValidationError {}

/// Trims a display name and rejects blank values.
pub fn normalize_name(name: &str) -> Result<String, UserValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(UserValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}

/// Trims a username and rejects blank values. Case is preserved.
pub fn normalize_username(username: &str) -> Result<String, UserValidationError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(UserValidationError::EmptyUsername);
    }
    Ok(trimmed.to_string())
}

/// Enforces the minimum password length. Passwords are never trimmed.
pub fn validate_password(password: &str) -> Result<(), UserValidationError> {
    let actual = password.chars().count();
    if actual < PASSWORD_MIN_CHARS {
        return Err(UserValidationError::PasswordTooShort {
            min: PASSWORD_MIN_CHARS,
            actual,
        });
    }
    Ok(())
}
