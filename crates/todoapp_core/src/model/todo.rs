//! Todo domain model.
//!
//! # Responsibility
//! - Define the canonical todo record and its write-side drafts.
//! - Validate user-provided title input.
//!
//! # Invariants
//! - `title` is never blank; title and description are stored as given.
//! - `is_deleted` is the source of truth for tombstone state.

use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Sequential todo identifier assigned by the store, starting at 1.
pub type TodoId = i64;

/// Upper bound for title length in characters.
pub const TITLE_MAX_CHARS: usize = 255;

/// Canonical persisted todo record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    /// Weak back-reference to the owning user; never cascades.
    pub owner_id: Option<UserId>,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_deleted: bool,
}

impl Todo {
    /// Returns whether this todo should be considered visible/active.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}

/// Validation failures for todo input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    EmptyTitle,
    TitleTooLong { max: usize, actual: usize },
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title cannot be empty"),
            Self::TitleTooLong { max, actual } => {
                write!(f, "title is too long: {actual} characters (max {max})")
            }
        }
    }
}

impl Error for TodoValidationError {}

/// Insert draft for a new todo. The store assigns `id` and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub owner_id: Option<UserId>,
}

impl NewTodo {
    /// Creates an incomplete, unowned draft with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            completed: false,
            owner_id: None,
        }
    }

    /// Checks the title rules. Fields are stored exactly as given.
    ///
    /// # Errors
    /// - `EmptyTitle` when the title is blank.
    /// - `TitleTooLong` when the title exceeds `TITLE_MAX_CHARS`.
    pub fn validate(&self) -> Result<(), TodoValidationError> {
        validate_title(&self.title)
    }
}

/// Full replacement of the mutable todo fields.
///
/// `created_at` and `owner_id` are never touched by an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoUpdate {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
}

impl TodoUpdate {
    pub fn validate(&self) -> Result<(), TodoValidationError> {
        validate_title(&self.title)
    }
}

/// Rejects whitespace-only and overlong titles.
///
/// Surrounding whitespace only matters for the blank check; the title is
/// never rewritten.
pub fn validate_title(title: &str) -> Result<(), TodoValidationError> {
    if title.trim().is_empty() {
        return Err(TodoValidationError::EmptyTitle);
    }

    let chars = title.chars().count();
    if chars > TITLE_MAX_CHARS {
        return Err(TodoValidationError::TitleTooLong {
            max: TITLE_MAX_CHARS,
            actual: chars,
        });
    }

    Ok(())
}
