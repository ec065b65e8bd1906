//! Thread-shared SQLite repository.
//!
//! # Responsibility
//! - Let many request workers use one migrated connection.
//!
//! # Invariants
//! - The connection lock is held for exactly one repository call, never
//!   across a whole service operation. Password hashing in `UserService`
//!   therefore runs with the lock released.
//! - Each call is still one SQL statement, so per-call atomicity is the same
//!   as `SqliteTodoRepository`/`SqliteUserRepository` on a private connection.

use crate::model::todo::{NewTodo, Todo, TodoId, TodoUpdate};
use crate::model::user::{User, UserChanges, UserId};
use crate::repo::todo_repo::{SqliteTodoRepository, TodoListQuery, TodoRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::RepoResult;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;

/// Cloneable handle to one SQLite connection guarded by a mutex.
#[derive(Clone)]
pub struct SharedSqlite {
    conn: Arc<Mutex<Connection>>,
}

impl SharedSqlite {
    /// Wraps a migrated connection (see `crate::db::open_db`).
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> T) -> T {
        let conn = self.conn.lock();
        f(&conn)
    }
}

impl UserRepository for SharedSqlite {
    fn insert_user(&self, user: &User) -> RepoResult<()> {
        self.with_conn(|conn| SqliteUserRepository::new(conn).insert_user(user))
    }

    fn get_user(&self, id: UserId, include_deleted: bool) -> RepoResult<Option<User>> {
        self.with_conn(|conn| SqliteUserRepository::new(conn).get_user(id, include_deleted))
    }

    fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.with_conn(|conn| SqliteUserRepository::new(conn).find_user_by_username(username))
    }

    fn update_user(&self, id: UserId, changes: &UserChanges) -> RepoResult<User> {
        self.with_conn(|conn| SqliteUserRepository::new(conn).update_user(id, changes))
    }

    fn soft_delete_user(&self, id: UserId) -> RepoResult<()> {
        self.with_conn(|conn| SqliteUserRepository::new(conn).soft_delete_user(id))
    }
}

impl TodoRepository for SharedSqlite {
    fn insert_todo(&self, draft: &NewTodo) -> RepoResult<Todo> {
        self.with_conn(|conn| SqliteTodoRepository::new(conn).insert_todo(draft))
    }

    fn get_todo(&self, id: TodoId, include_deleted: bool) -> RepoResult<Option<Todo>> {
        self.with_conn(|conn| SqliteTodoRepository::new(conn).get_todo(id, include_deleted))
    }

    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<Vec<Todo>> {
        self.with_conn(|conn| SqliteTodoRepository::new(conn).list_todos(query))
    }

    fn replace_todo(&self, id: TodoId, update: &TodoUpdate) -> RepoResult<Todo> {
        self.with_conn(|conn| SqliteTodoRepository::new(conn).replace_todo(id, update))
    }

    fn toggle_todo(&self, id: TodoId) -> RepoResult<Todo> {
        self.with_conn(|conn| SqliteTodoRepository::new(conn).toggle_todo(id))
    }

    fn set_todo_completed(&self, id: TodoId, completed: bool) -> RepoResult<Todo> {
        self.with_conn(|conn| SqliteTodoRepository::new(conn).set_todo_completed(id, completed))
    }

    fn soft_delete_todo(&self, id: TodoId) -> RepoResult<()> {
        self.with_conn(|conn| SqliteTodoRepository::new(conn).soft_delete_todo(id))
    }
}
