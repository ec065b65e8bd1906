//! In-memory repository backend.
//!
//! # Responsibility
//! - Implement `UserRepository` and `TodoRepository` without external storage.
//! - Mirror SQLite semantics: sequential todo ids, soft-delete, username
//!   uniqueness among active users, owner existence on insert.
//!
//! # Invariants
//! - All tables live behind one mutex; every repository call is a single
//!   critical section, which serializes mutations per record.
//! - Data is lost when the store is dropped.

use crate::model::now_epoch_ms;
use crate::model::todo::{NewTodo, Todo, TodoId, TodoUpdate};
use crate::model::user::{User, UserChanges, UserId};
use crate::repo::todo_repo::{normalize_todo_limit, TodoListQuery, TodoRepository};
use crate::repo::user_repo::UserRepository;
use crate::repo::{RepoError, RepoResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    todos: BTreeMap<TodoId, Todo>,
    last_todo_id: TodoId,
}

impl Tables {
    fn username_taken(&self, username: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|user| user.is_active() && user.username == username && Some(user.id) != except)
    }

    fn active_todo_mut(&mut self, id: TodoId) -> RepoResult<&mut Todo> {
        self.todos
            .get_mut(&id)
            .filter(|todo| todo.is_active())
            .ok_or(RepoError::TodoNotFound(id))
    }
}

/// Thread-safe in-memory store for users and todos.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserRepository for MemoryStore {
    fn insert_user(&self, user: &User) -> RepoResult<()> {
        let mut tables = self.tables.lock();
        if tables.username_taken(&user.username, None) {
            return Err(RepoError::DuplicateUsername(user.username.clone()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    fn get_user(&self, id: UserId, include_deleted: bool) -> RepoResult<Option<User>> {
        let tables = self.tables.lock();
        Ok(tables
            .users
            .get(&id)
            .filter(|user| include_deleted || user.is_active())
            .cloned())
    }

    fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let tables = self.tables.lock();
        Ok(tables
            .users
            .values()
            .find(|user| user.is_active() && user.username == username)
            .cloned())
    }

    fn update_user(&self, id: UserId, changes: &UserChanges) -> RepoResult<User> {
        let mut tables = self.tables.lock();

        if !tables.users.get(&id).map_or(false, User::is_active) {
            return Err(RepoError::UserNotFound(id));
        }
        if let Some(username) = changes.username.as_deref() {
            if tables.username_taken(username, Some(id)) {
                return Err(RepoError::DuplicateUsername(username.to_string()));
            }
        }

        let user = tables
            .users
            .get_mut(&id)
            .ok_or(RepoError::UserNotFound(id))?;

        if let Some(name) = &changes.name {
            user.name.clone_from(name);
        }
        if let Some(username) = &changes.username {
            user.username.clone_from(username);
        }
        if let Some(password_hash) = &changes.password_hash {
            user.password_hash.clone_from(password_hash);
        }
        user.updated_at = now_epoch_ms();

        Ok(user.clone())
    }

    fn soft_delete_user(&self, id: UserId) -> RepoResult<()> {
        let mut tables = self.tables.lock();
        let user = tables
            .users
            .get_mut(&id)
            .filter(|user| user.is_active())
            .ok_or(RepoError::UserNotFound(id))?;

        user.is_deleted = true;
        user.updated_at = now_epoch_ms();
        Ok(())
    }
}

impl TodoRepository for MemoryStore {
    fn insert_todo(&self, draft: &NewTodo) -> RepoResult<Todo> {
        draft.validate()?;

        let mut tables = self.tables.lock();
        if let Some(owner_id) = draft.owner_id {
            let owner_active = tables
                .users
                .get(&owner_id)
                .map_or(false, User::is_active);
            if !owner_active {
                return Err(RepoError::OwnerNotFound(owner_id));
            }
        }

        tables.last_todo_id += 1;
        let now = now_epoch_ms();
        let todo = Todo {
            id: tables.last_todo_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            completed: draft.completed,
            owner_id: draft.owner_id,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        };
        tables.todos.insert(todo.id, todo.clone());
        Ok(todo)
    }

    fn get_todo(&self, id: TodoId, include_deleted: bool) -> RepoResult<Option<Todo>> {
        let tables = self.tables.lock();
        Ok(tables
            .todos
            .get(&id)
            .filter(|todo| include_deleted || todo.is_active())
            .cloned())
    }

    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<Vec<Todo>> {
        let needle = query.title_contains.as_deref().map(str::to_lowercase);
        let tables = self.tables.lock();

        let mut todos: Vec<Todo> = tables
            .todos
            .values()
            .filter(|todo| query.include_deleted || todo.is_active())
            .filter(|todo| query.owner_id.is_none() || todo.owner_id == query.owner_id)
            .filter(|todo| query.completed.map_or(true, |completed| todo.completed == completed))
            .filter(|todo| {
                needle
                    .as_deref()
                    .map_or(true, |needle| todo.title.to_lowercase().contains(needle))
            })
            .cloned()
            .collect();
        drop(tables);

        todos.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let page = todos.into_iter().skip(offset);
        Ok(match normalize_todo_limit(query.limit) {
            Some(limit) => page
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect(),
            None => page.collect(),
        })
    }

    fn replace_todo(&self, id: TodoId, update: &TodoUpdate) -> RepoResult<Todo> {
        update.validate()?;

        let mut tables = self.tables.lock();
        let todo = tables.active_todo_mut(id)?;
        todo.title.clone_from(&update.title);
        todo.description.clone_from(&update.description);
        todo.completed = update.completed;
        todo.updated_at = now_epoch_ms();
        Ok(todo.clone())
    }

    fn toggle_todo(&self, id: TodoId) -> RepoResult<Todo> {
        let mut tables = self.tables.lock();
        let todo = tables.active_todo_mut(id)?;
        todo.completed = !todo.completed;
        todo.updated_at = now_epoch_ms();
        Ok(todo.clone())
    }

    fn set_todo_completed(&self, id: TodoId, completed: bool) -> RepoResult<Todo> {
        let mut tables = self.tables.lock();
        let todo = tables.active_todo_mut(id)?;
        todo.completed = completed;
        todo.updated_at = now_epoch_ms();
        Ok(todo.clone())
    }

    fn soft_delete_todo(&self, id: TodoId) -> RepoResult<()> {
        let mut tables = self.tables.lock();
        let todo = tables.active_todo_mut(id)?;
        todo.is_deleted = true;
        todo.updated_at = now_epoch_ms();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::model::todo::NewTodo;
    use crate::repo::todo_repo::TodoRepository;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_toggles_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let todo = store.insert_todo(&NewTodo::new("flip me")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..25 {
                        store.toggle_todo(todo.id).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 200 flips in total: back to the initial state.
        let loaded = store.get_todo(todo.id, false).unwrap().unwrap();
        assert!(!loaded.completed);
    }
}
