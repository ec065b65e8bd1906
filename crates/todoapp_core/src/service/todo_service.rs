//! Todo ledger use-case service.
//!
//! # Responsibility
//! - Provide create/get/list/update/toggle/delete entry points for todos.
//! - Reject invalid input before it reaches the repository.
//!
//! # Invariants
//! - Every mutation is delegated to one atomic repository call.
//! - `update` replaces title, description and completion state but never
//!   `created_at` or the owner.

use crate::model::todo::{NewTodo, Todo, TodoId, TodoUpdate};
use crate::model::user::UserId;
use crate::repo::todo_repo::{TodoListQuery, TodoRepository};
use crate::service::{ServiceError, ServiceResult};
use log::info;

/// Use-case service wrapper for todo operations.
pub struct TodoService<R: TodoRepository> {
    repo: R,
}

impl<R: TodoRepository> TodoService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a todo from a draft.
    ///
    /// # Errors
    /// - `InvalidTodo` when the title is blank or too long.
    /// - `OwnerNotFound` when `owner_id` does not name an active user.
    pub fn create(&self, draft: &NewTodo) -> ServiceResult<Todo> {
        draft.validate()?;
        let todo = self.repo.insert_todo(draft)?;
        info!(
            "event=todo_create module=todo_service status=ok todo_id={} owned={}",
            todo.id,
            todo.owner_id.is_some()
        );
        Ok(todo)
    }

    pub fn get_by_id(&self, id: TodoId) -> ServiceResult<Todo> {
        self.repo
            .get_todo(id, false)?
            .ok_or(ServiceError::TodoNotFound(id))
    }

    /// Lists todos matching `query`, newest first.
    pub fn list(&self, query: &TodoListQuery) -> ServiceResult<Vec<Todo>> {
        let mut query = query.clone();
        query.title_contains = query
            .title_contains
            .map(|needle| needle.trim().to_string())
            .filter(|needle| !needle.is_empty());
        Ok(self.repo.list_todos(&query)?)
    }

    /// All visible todos, newest first.
    pub fn list_all(&self) -> ServiceResult<Vec<Todo>> {
        self.list(&TodoListQuery::default())
    }

    pub fn list_by_owner(&self, owner_id: UserId) -> ServiceResult<Vec<Todo>> {
        self.list(&TodoListQuery::for_owner(owner_id))
    }

    pub fn list_active(&self) -> ServiceResult<Vec<Todo>> {
        self.list(&TodoListQuery {
            completed: Some(false),
            ..TodoListQuery::default()
        })
    }

    pub fn list_completed(&self) -> ServiceResult<Vec<Todo>> {
        self.list(&TodoListQuery {
            completed: Some(true),
            ..TodoListQuery::default()
        })
    }

    /// Case-insensitive substring search on titles.
    pub fn search_by_title(&self, needle: &str) -> ServiceResult<Vec<Todo>> {
        self.list(&TodoListQuery {
            title_contains: Some(needle.to_string()),
            ..TodoListQuery::default()
        })
    }

    /// Replaces the mutable fields of an active todo.
    pub fn update(&self, id: TodoId, update: &TodoUpdate) -> ServiceResult<Todo> {
        update.validate()?;
        let todo = self.repo.replace_todo(id, update)?;
        info!("event=todo_update module=todo_service status=ok todo_id={id}");
        Ok(todo)
    }

    /// Flips the completion flag atomically.
    pub fn toggle_complete(&self, id: TodoId) -> ServiceResult<Todo> {
        let todo = self.repo.toggle_todo(id)?;
        info!(
            "event=todo_toggle module=todo_service status=ok todo_id={id} completed={}",
            todo.completed
        );
        Ok(todo)
    }

    pub fn mark_completed(&self, id: TodoId) -> ServiceResult<Todo> {
        Ok(self.repo.set_todo_completed(id, true)?)
    }

    pub fn mark_active(&self, id: TodoId) -> ServiceResult<Todo> {
        Ok(self.repo.set_todo_completed(id, false)?)
    }

    /// Soft-deletes an active todo.
    pub fn delete(&self, id: TodoId) -> ServiceResult<()> {
        self.repo.soft_delete_todo(id)?;
        info!("event=todo_delete module=todo_service status=ok todo_id={id}");
        Ok(())
    }
}
